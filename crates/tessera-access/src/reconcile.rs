//! Reconciliation of organization membership with explicit project grants.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tessera_storage::{OrganizationMember, OrganizationRole, ProjectGrant, ProjectRole, UserId};
use tracing::{debug, warn};

use crate::hierarchy::RoleHierarchy;
use crate::snapshot::Snapshot;

/// Data-integrity note attached to an explicit entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessWarning {
    /// The grant's email matches no member of the organization snapshot.
    OrphanGrant,
}

impl std::fmt::Display for AccessWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccessWarning::OrphanGrant => write!(f, "user is not a member of the organization"),
        }
    }
}

/// A user holding an explicit grant on the project.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ExplicitAccess {
    pub user_id: UserId,
    pub email: String,
    /// The stored role. Organization roles never change it.
    pub role: ProjectRole,
    /// The user's organization role, `None` for orphan grants.
    pub organization_role: Option<OrganizationRole>,
    /// Set when `organization_role` already confers at least `role`.
    pub overlapping_org_role: Option<OrganizationRole>,
    pub warning: Option<AccessWarning>,
}

impl ExplicitAccess {
    pub fn is_orphan(&self) -> bool {
        self.warning == Some(AccessWarning::OrphanGrant)
    }
}

/// A user with no explicit grant who reaches the project through an elevated
/// organization role. The concrete project role it resolves to is decided by
/// the authorization policy, not here.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct InheritedAccess {
    pub user_id: UserId,
    pub email: String,
    pub inherited_via: OrganizationRole,
}

/// Output of one reconciliation pass.
///
/// Explicit entries follow grant input order; inherited and excluded entries
/// follow member input order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ReconciledAccess {
    pub explicit: Vec<ExplicitAccess>,
    pub inherited: Vec<InheritedAccess>,
    /// Members with no grant and no elevated organization role.
    pub excluded: Vec<UserId>,
}

impl ReconciledAccess {
    pub fn orphans(&self) -> impl Iterator<Item = &ExplicitAccess> {
        self.explicit.iter().filter(|entry| entry.is_orphan())
    }

    pub fn explicit_for(&self, user_id: &UserId) -> Option<&ExplicitAccess> {
        self.explicit.iter().find(|entry| &entry.user_id == user_id)
    }

    pub fn inherited_for(&self, user_id: &UserId) -> Option<&InheritedAccess> {
        self.inherited.iter().find(|entry| &entry.user_id == user_id)
    }
}

/// Pure, synchronous reconciler. Safe to re-run whenever either input changes.
#[derive(Clone, Copy, Debug, Default)]
pub struct AccessReconciler {
    hierarchy: RoleHierarchy,
}

impl AccessReconciler {
    pub fn new(hierarchy: RoleHierarchy) -> Self {
        Self { hierarchy }
    }

    pub fn hierarchy(&self) -> &RoleHierarchy {
        &self.hierarchy
    }

    /// Partition `members` and annotate `grants`.
    ///
    /// Members are matched to grants by exact email. Members with a grant are
    /// only ever emitted from the grant pass, so nobody appears as both
    /// explicit and inherited.
    pub fn reconcile(
        &self,
        members: &[OrganizationMember],
        grants: &[ProjectGrant],
    ) -> ReconciledAccess {
        let granted: HashSet<&str> = grants.iter().map(|g| g.email.as_str()).collect();

        let mut inherited = Vec::new();
        let mut excluded = Vec::new();
        for member in members
            .iter()
            .filter(|m| !granted.contains(m.email.as_str()))
        {
            if member.role.confers_access() {
                inherited.push(InheritedAccess {
                    user_id: member.user_id.clone(),
                    email: member.email.clone(),
                    inherited_via: member.role,
                });
            } else {
                excluded.push(member.user_id.clone());
            }
        }

        // Emails are unique per organization; on a duplicate the first member wins.
        let mut by_email: HashMap<&str, &OrganizationMember> = HashMap::with_capacity(members.len());
        for member in members {
            by_email.entry(member.email.as_str()).or_insert(member);
        }

        let explicit: Vec<ExplicitAccess> = grants
            .iter()
            .map(|grant| self.annotate(grant, by_email.get(grant.email.as_str()).copied()))
            .collect();

        debug!(
            explicit = explicit.len(),
            inherited = inherited.len(),
            excluded = excluded.len(),
            "reconciled project access"
        );

        ReconciledAccess {
            explicit,
            inherited,
            excluded,
        }
    }

    /// Reconcile only when both snapshots are ready; otherwise pass the
    /// unavailable state through untouched.
    pub fn reconcile_snapshots(
        &self,
        members: &Snapshot<Vec<OrganizationMember>>,
        grants: &Snapshot<Vec<ProjectGrant>>,
    ) -> Snapshot<ReconciledAccess> {
        members
            .as_ref()
            .zip(grants.as_ref())
            .map(|(members, grants)| self.reconcile(members, grants))
    }

    fn annotate(
        &self,
        grant: &ProjectGrant,
        member: Option<&OrganizationMember>,
    ) -> ExplicitAccess {
        match member {
            Some(member) => ExplicitAccess {
                user_id: grant.user_id.clone(),
                email: grant.email.clone(),
                role: grant.role,
                organization_role: Some(member.role),
                overlapping_org_role: self.hierarchy.overlap(grant.role, member.role),
                warning: None,
            },
            None => {
                warn!(
                    project_id = %grant.project_id,
                    user_id = %grant.user_id,
                    email = %grant.email,
                    "project grant references a user outside the organization"
                );
                ExplicitAccess {
                    user_id: grant.user_id.clone(),
                    email: grant.email.clone(),
                    role: grant.role,
                    organization_role: None,
                    overlapping_org_role: None,
                    warning: Some(AccessWarning::OrphanGrant),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tessera_storage::{OrganizationId, ProjectId};
    use uuid::Uuid;

    struct Fixture {
        org: OrganizationId,
        project: ProjectId,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                org: OrganizationId(Uuid::new_v4()),
                project: ProjectId(Uuid::new_v4()),
            }
        }

        fn member(&self, email: &str, role: OrganizationRole) -> OrganizationMember {
            OrganizationMember {
                organization_id: self.org.clone(),
                user_id: UserId(Uuid::new_v4()),
                email: email.to_string(),
                role,
                joined_at: Utc::now(),
            }
        }

        fn grant(&self, member: &OrganizationMember, role: ProjectRole) -> ProjectGrant {
            ProjectGrant {
                project_id: self.project.clone(),
                user_id: member.user_id.clone(),
                email: member.email.clone(),
                role,
                created_at: Utc::now(),
            }
        }

        fn orphan_grant(&self, email: &str, role: ProjectRole) -> ProjectGrant {
            ProjectGrant {
                project_id: self.project.clone(),
                user_id: UserId(Uuid::new_v4()),
                email: email.to_string(),
                role,
                created_at: Utc::now(),
            }
        }
    }

    fn reconciler() -> AccessReconciler {
        AccessReconciler::default()
    }

    #[test]
    fn explicit_grant_annotated_with_overlapping_org_role() {
        let f = Fixture::new();
        let a = f.member("a@x", OrganizationRole::Editor);
        let b = f.member("b@x", OrganizationRole::Member);
        let grants = vec![f.grant(&a, ProjectRole::Viewer)];

        let result = reconciler().reconcile(&[a.clone(), b.clone()], &grants);

        assert_eq!(result.explicit.len(), 1);
        let entry = &result.explicit[0];
        assert_eq!(entry.user_id, a.user_id);
        assert_eq!(entry.role, ProjectRole::Viewer);
        assert_eq!(entry.overlapping_org_role, Some(OrganizationRole::Editor));
        assert!(!entry.is_orphan());
        assert!(result.inherited.is_empty());
        assert_eq!(result.excluded, vec![b.user_id]);
    }

    #[test]
    fn member_without_grant_inherits_via_org_role() {
        let f = Fixture::new();
        let c = f.member("c@x", OrganizationRole::Developer);

        let result = reconciler().reconcile(&[c.clone()], &[]);

        assert!(result.explicit.is_empty());
        assert_eq!(
            result.inherited,
            vec![InheritedAccess {
                user_id: c.user_id,
                email: "c@x".to_string(),
                inherited_via: OrganizationRole::Developer,
            }]
        );
        assert!(result.excluded.is_empty());
    }

    #[test]
    fn orphan_grant_is_still_rendered() {
        let f = Fixture::new();
        let grants = vec![f.orphan_grant("ghost@x", ProjectRole::Admin)];

        let result = reconciler().reconcile(&[], &grants);

        assert_eq!(result.explicit.len(), 1);
        let entry = &result.explicit[0];
        assert_eq!(entry.role, ProjectRole::Admin);
        assert_eq!(entry.organization_role, None);
        assert_eq!(entry.overlapping_org_role, None);
        assert_eq!(entry.warning, Some(AccessWarning::OrphanGrant));
        assert_eq!(result.orphans().count(), 1);
    }

    #[test]
    fn grant_holder_with_elevated_org_role_is_never_inherited() {
        let f = Fixture::new();
        let admin = f.member("admin@x", OrganizationRole::Admin);
        let grants = vec![f.grant(&admin, ProjectRole::Admin)];

        let result = reconciler().reconcile(&[admin.clone()], &grants);

        assert!(result.inherited_for(&admin.user_id).is_none());
        let entry = result.explicit_for(&admin.user_id).unwrap();
        assert_eq!(entry.role, ProjectRole::Admin);
        // Nothing implies project admin, so no overlap annotation.
        assert_eq!(entry.overlapping_org_role, None);
        assert_eq!(entry.organization_role, Some(OrganizationRole::Admin));
    }

    #[test]
    fn overlap_only_when_org_role_covers_explicit_role() {
        let f = Fixture::new();
        let editor = f.member("editor@x", OrganizationRole::Editor);
        let grants = vec![f.grant(&editor, ProjectRole::Developer)];

        let result = reconciler().reconcile(&[editor], &grants);

        assert_eq!(result.explicit[0].overlapping_org_role, None);
        assert_eq!(
            result.explicit[0].organization_role,
            Some(OrganizationRole::Editor)
        );
    }

    #[test]
    fn member_with_grant_but_member_role_is_explicit_not_excluded() {
        let f = Fixture::new();
        let plain = f.member("plain@x", OrganizationRole::Member);
        let grants = vec![f.grant(&plain, ProjectRole::Editor)];

        let result = reconciler().reconcile(&[plain.clone()], &grants);

        assert!(result.excluded.is_empty());
        assert_eq!(result.explicit.len(), 1);
        assert_eq!(result.explicit[0].overlapping_org_role, None);
    }

    #[test]
    fn partition_is_complete_and_disjoint() {
        let f = Fixture::new();
        let members: Vec<_> = OrganizationRole::ALL
            .iter()
            .enumerate()
            .flat_map(|(i, role)| {
                vec![
                    f.member(&format!("granted{i}@x"), *role),
                    f.member(&format!("plain{i}@x"), *role),
                ]
            })
            .collect();
        let grants: Vec<_> = members
            .iter()
            .filter(|m| m.email.starts_with("granted"))
            .zip(ProjectRole::ALL.iter().cycle())
            .map(|(m, role)| f.grant(m, *role))
            .collect();

        let result = reconciler().reconcile(&members, &grants);

        assert_eq!(
            result.explicit.len() + result.inherited.len() + result.excluded.len(),
            members.len()
        );
        for member in &members {
            let hits = usize::from(result.explicit_for(&member.user_id).is_some())
                + usize::from(result.inherited_for(&member.user_id).is_some())
                + usize::from(result.excluded.contains(&member.user_id));
            assert_eq!(hits, 1, "{} appears {} times", member.email, hits);
        }
    }

    #[test]
    fn ordering_follows_inputs() {
        let f = Fixture::new();
        let m1 = f.member("m1@x", OrganizationRole::Viewer);
        let m2 = f.member("m2@x", OrganizationRole::Admin);
        let m3 = f.member("m3@x", OrganizationRole::Editor);
        let m4 = f.member("m4@x", OrganizationRole::Developer);
        let grants = vec![
            f.grant(&m4, ProjectRole::Viewer),
            f.orphan_grant("gone@x", ProjectRole::Editor),
            f.grant(&m2, ProjectRole::Viewer),
        ];

        let result = reconciler().reconcile(&[m1.clone(), m2, m3.clone(), m4], &grants);

        let explicit: Vec<_> = result.explicit.iter().map(|e| e.email.as_str()).collect();
        assert_eq!(explicit, vec!["m4@x", "gone@x", "m2@x"]);
        let inherited: Vec<_> = result.inherited.iter().map(|e| &e.user_id).collect();
        assert_eq!(inherited, vec![&m1.user_id, &m3.user_id]);
    }

    #[test]
    fn reconcile_is_idempotent() {
        let f = Fixture::new();
        let members = vec![
            f.member("a@x", OrganizationRole::Editor),
            f.member("b@x", OrganizationRole::Member),
            f.member("c@x", OrganizationRole::InteractiveViewer),
        ];
        let grants = vec![
            f.grant(&members[0], ProjectRole::Editor),
            f.orphan_grant("z@x", ProjectRole::Viewer),
        ];

        let r = reconciler();
        assert_eq!(r.reconcile(&members, &grants), r.reconcile(&members, &grants));
    }

    #[test]
    fn empty_members_still_renders_grants_without_overlap() {
        let f = Fixture::new();
        let grants = vec![
            f.orphan_grant("a@x", ProjectRole::Viewer),
            f.orphan_grant("b@x", ProjectRole::Developer),
        ];

        let result = reconciler().reconcile(&[], &grants);

        assert_eq!(result.explicit.len(), 2);
        assert!(result.explicit.iter().all(|e| e.overlapping_org_role.is_none()));
        assert!(result.inherited.is_empty());
        assert!(result.excluded.is_empty());
    }

    #[test]
    fn custom_hierarchy_drives_overlap() {
        use OrganizationRole as Org;
        const GENEROUS: RoleHierarchy = RoleHierarchy::from_table([
            &[Org::Viewer, Org::Admin],
            &[Org::Admin],
            &[Org::Admin],
            &[Org::Admin],
            &[Org::Admin],
        ]);

        let f = Fixture::new();
        let viewer = f.member("v@x", Org::Viewer);
        let admin = f.member("a@x", Org::Admin);
        let grants = vec![
            f.grant(&viewer, ProjectRole::Viewer),
            f.grant(&admin, ProjectRole::Admin),
        ];

        let result = AccessReconciler::new(GENEROUS).reconcile(&[viewer, admin], &grants);

        assert_eq!(result.explicit[0].overlapping_org_role, Some(Org::Viewer));
        assert_eq!(result.explicit[1].overlapping_org_role, Some(Org::Admin));
    }

    #[test]
    fn snapshots_not_ready_skip_reconciliation() {
        let f = Fixture::new();
        let members = Snapshot::Ready(vec![f.member("a@x", OrganizationRole::Admin)]);

        let loading: Snapshot<Vec<ProjectGrant>> = Snapshot::Loading;
        assert!(matches!(
            reconciler().reconcile_snapshots(&members, &loading),
            Snapshot::Loading
        ));

        let failed: Snapshot<Vec<ProjectGrant>> = Snapshot::Failed("timeout".to_string());
        assert!(matches!(
            reconciler().reconcile_snapshots(&members, &failed),
            Snapshot::Failed(reason) if reason == "timeout"
        ));

        let ready = reconciler().reconcile_snapshots(&members, &Snapshot::Ready(vec![]));
        let access = ready.ready().unwrap();
        assert_eq!(access.inherited.len(), 1);
    }
}
