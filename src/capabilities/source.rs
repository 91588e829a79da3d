//! Case content capability. The shell resolves these requests against
//! whatever backs the catalog (bundled data in the simulated host, a remote
//! service in production); the core only sees typed results.

use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::{CaseDetail, CaseSummary, Category};
use crate::model::{CaseId, CategoryId};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum SourceOperation {
    Categories,
    Cases { category_id: CategoryId },
    Detail { case_id: CaseId },
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum SourceOutput {
    Categories(Vec<Category>),
    Cases(Vec<CaseSummary>),
    Detail(Box<CaseDetail>),
}

#[derive(Error, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum SourceError {
    #[error("not found: {resource}")]
    NotFound { resource: String },

    #[error("content source unavailable: {message}")]
    Unavailable { message: String },

    #[error("malformed content: {message}")]
    Malformed { message: String },
}

pub type SourceResult = Result<SourceOutput, SourceError>;

impl Operation for SourceOperation {
    type Output = SourceResult;
}

pub struct Source<Ev> {
    context: CapabilityContext<SourceOperation, Ev>,
}

impl<Ev> Capability<Ev> for Source<Ev> {
    type Operation = SourceOperation;
    type MappedSelf<MappedEv> = Source<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static,
    {
        Source::new(self.context.map_event(f))
    }
}

impl<Ev> Source<Ev>
where
    Ev: 'static,
{
    pub fn new(context: CapabilityContext<SourceOperation, Ev>) -> Self {
        Self { context }
    }

    pub fn categories<F>(&self, make_event: F)
    where
        F: Fn(SourceResult) -> Ev + Send + Sync + 'static,
    {
        self.request(SourceOperation::Categories, make_event);
    }

    pub fn cases<F>(&self, category_id: CategoryId, make_event: F)
    where
        F: Fn(SourceResult) -> Ev + Send + Sync + 'static,
    {
        self.request(SourceOperation::Cases { category_id }, make_event);
    }

    pub fn detail<F>(&self, case_id: CaseId, make_event: F)
    where
        F: Fn(SourceResult) -> Ev + Send + Sync + 'static,
    {
        self.request(SourceOperation::Detail { case_id }, make_event);
    }

    fn request<F>(&self, operation: SourceOperation, make_event: F)
    where
        F: Fn(SourceResult) -> Ev + Send + Sync + 'static,
    {
        let context = self.context.clone();
        self.context.spawn(async move {
            let result = context.request_from_shell(operation).await;
            context.update_app(make_event(result));
        });
    }
}
