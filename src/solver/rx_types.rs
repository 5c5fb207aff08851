use crate::abi;
use crate::config::{Artifact, Library};
use crate::diagnostics::messages;
use crate::model::TypeRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxVersion {
    Two,
    Three,
}

impl RxVersion {
    pub fn module(self) -> &'static str {
        match self {
            RxVersion::Two => "rx2",
            RxVersion::Three => "rx3",
        }
    }

    pub fn library(self) -> Library {
        match self {
            RxVersion::Two => Library::Rx2,
            RxVersion::Three => Library::Rx3,
        }
    }

    pub fn artifact(self) -> Artifact {
        match self {
            RxVersion::Two => Artifact::RxJava2,
            RxVersion::Three => Artifact::RxJava3,
        }
    }

    pub fn missing_artifact_message(self) -> &'static str {
        match self {
            RxVersion::Two => messages::MISSING_RXJAVA2_ARTIFACT,
            RxVersion::Three => messages::MISSING_RXJAVA3_ARTIFACT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxKind {
    Flowable,
    Observable,
    Single,
    Maybe,
    Completable,
}

/// One reactive type of one Rx generation, e.g. `rx3::Maybe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RxType {
    pub version: RxVersion,
    pub kind: RxKind,
}

impl RxType {
    pub const fn new(version: RxVersion, kind: RxKind) -> Self {
        Self { version, kind }
    }

    /// Types that re-emit whenever an observed table changes.
    pub const OBSERVABLES: [RxType; 4] = [
        RxType::new(RxVersion::Two, RxKind::Flowable),
        RxType::new(RxVersion::Two, RxKind::Observable),
        RxType::new(RxVersion::Three, RxKind::Flowable),
        RxType::new(RxVersion::Three, RxKind::Observable),
    ];

    /// Types that run the query once per subscription.
    pub const CALLABLES: [RxType; 4] = [
        RxType::new(RxVersion::Two, RxKind::Single),
        RxType::new(RxVersion::Two, RxKind::Maybe),
        RxType::new(RxVersion::Three, RxKind::Single),
        RxType::new(RxVersion::Three, RxKind::Maybe),
    ];

    /// Types a write method may return.
    pub const PREPARED: [RxType; 6] = [
        RxType::new(RxVersion::Two, RxKind::Single),
        RxType::new(RxVersion::Two, RxKind::Maybe),
        RxType::new(RxVersion::Two, RxKind::Completable),
        RxType::new(RxVersion::Three, RxKind::Single),
        RxType::new(RxVersion::Three, RxKind::Maybe),
        RxType::new(RxVersion::Three, RxKind::Completable),
    ];

    fn simple_name(self) -> &'static str {
        match self.kind {
            RxKind::Flowable => "Flowable",
            RxKind::Observable => "Observable",
            RxKind::Single => "Single",
            RxKind::Maybe => "Maybe",
            RxKind::Completable => "Completable",
        }
    }

    /// Full path of the type, e.g. `daoc_runtime::rx2::Flowable`.
    pub fn path(self) -> String {
        format!("daoc_runtime::{}::{}", self.version.module(), self.simple_name())
    }

    /// The runtime factory building a value of this type.
    pub fn factory(self) -> String {
        let method = match self.kind {
            RxKind::Flowable => "create_flowable",
            RxKind::Observable => "create_observable",
            RxKind::Single => "create_single",
            RxKind::Maybe => "create_maybe",
            RxKind::Completable => "create_completable",
        };
        format!("daoc_runtime::{}::{}::{method}", self.version.module(), abi::rx::RX_DAOC)
    }

    /// Completable carries no value; every other type has one argument.
    pub fn matches(self, ty: &TypeRef) -> bool {
        let arity = if self.kind == RxKind::Completable { 0 } else { 1 };
        ty.args().len() == arity && abi::matches_path(ty, &self.path())
    }

    pub fn is_single(self) -> bool {
        self.kind == RxKind::Single
    }
}
