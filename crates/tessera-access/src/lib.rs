//! Effective project access for tessera.
//!
//! A user can reach a project two ways: an explicit grant on the project, or a
//! role in the project's organization. [`AccessReconciler`] folds both sources
//! into one view where every organization member lands in exactly one of
//! explicit, inherited or excluded, and every grant is rendered even when its
//! user has left the organization.
//!
//! Mutations of explicit grants go through [`ProjectAccessService`], which
//! re-evaluates the [`CapabilityGate`] before handing them to the
//! [`AccessMutationService`]. A [`ProjectAccessView`] row only offers controls
//! when the gate passed at load time.

mod error;
mod gate;
mod hierarchy;
mod mutation;
mod reconcile;
mod service;
mod snapshot;
mod view;

pub use error::AccessError;
pub use gate::{ActorContext, CapabilityGate, ProjectAdminGate};
pub use hierarchy::RoleHierarchy;
pub use mutation::{AccessMutationService, PendingGuard, PendingMutations, StoreMutationService};
pub use reconcile::{AccessReconciler, AccessWarning, ExplicitAccess, InheritedAccess, ReconciledAccess};
pub use service::ProjectAccessService;
pub use snapshot::Snapshot;
pub use view::{ExplicitRow, GrantControls, InheritedRow, ProjectAccessView};

#[cfg(any(test, feature = "test-support"))]
pub use gate::MockCapabilityGate;
#[cfg(any(test, feature = "test-support"))]
pub use mutation::MockAccessMutationService;
