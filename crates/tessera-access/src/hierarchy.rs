//! Which organization roles already confer a given project role.

use tessera_storage::OrganizationRole as Org;
use tessera_storage::{OrganizationRole, ProjectRole};

const VIEWER: &[OrganizationRole] = &[Org::InteractiveViewer, Org::Editor, Org::Developer, Org::Admin];
const INTERACTIVE_VIEWER: &[OrganizationRole] = &[Org::Editor, Org::Developer, Org::Admin];
const EDITOR: &[OrganizationRole] = &[Org::Developer, Org::Admin];
const DEVELOPER: &[OrganizationRole] = &[Org::Admin];
const ADMIN: &[OrganizationRole] = &[];

/// Static lookup table from project role to the organization roles that
/// already imply at least that project role.
///
/// Entries are indexed in [`ProjectRole::ALL`] order. A well-formed table is
/// monotonic: the set for a lower project role contains the set for every
/// higher one. The reconciler trusts the table; [`RoleHierarchy::is_monotonic`]
/// exists so table authors can check it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RoleHierarchy {
    entries: [&'static [OrganizationRole]; 5],
}

impl RoleHierarchy {
    /// The table shipped with tessera.
    pub const fn standard() -> Self {
        Self {
            entries: [VIEWER, INTERACTIVE_VIEWER, EDITOR, DEVELOPER, ADMIN],
        }
    }

    /// Build a custom table. `entries[i]` belongs to `ProjectRole::ALL[i]`.
    pub const fn from_table(entries: [&'static [OrganizationRole]; 5]) -> Self {
        Self { entries }
    }

    /// Organization roles that already confer `project_role`.
    pub fn implied_by(&self, project_role: ProjectRole) -> &'static [OrganizationRole] {
        self.entries[project_role as usize]
    }

    pub fn implies(&self, org_role: OrganizationRole, project_role: ProjectRole) -> bool {
        self.implied_by(project_role).contains(&org_role)
    }

    /// `Some(org_role)` when the organization role already covers the explicit role.
    pub fn overlap(
        &self,
        project_role: ProjectRole,
        org_role: OrganizationRole,
    ) -> Option<OrganizationRole> {
        self.implies(org_role, project_role).then_some(org_role)
    }

    pub fn is_monotonic(&self) -> bool {
        ProjectRole::ALL.windows(2).all(|pair| {
            let lower = self.implied_by(pair[0]);
            self.implied_by(pair[1])
                .iter()
                .all(|role| lower.contains(role))
        })
    }
}

impl Default for RoleHierarchy {
    fn default() -> Self {
        Self::standard()
    }
}
