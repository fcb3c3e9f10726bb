//! Role types for project grants and organization membership.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Role granted explicitly on a single project.
///
/// Variants are declared in privilege order, so the derived `Ord` gives
/// `Viewer < InteractiveViewer < Editor < Developer < Admin`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectRole {
    Viewer,
    InteractiveViewer,
    Editor,
    Developer,
    Admin,
}

/// Error type for parsing ProjectRole from string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseProjectRoleError(pub String);

impl std::fmt::Display for ParseProjectRoleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid project role: {}", self.0)
    }
}

impl std::error::Error for ParseProjectRoleError {}

impl FromStr for ProjectRole {
    type Err = ParseProjectRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "viewer" => Ok(ProjectRole::Viewer),
            "interactive_viewer" => Ok(ProjectRole::InteractiveViewer),
            "editor" => Ok(ProjectRole::Editor),
            "developer" => Ok(ProjectRole::Developer),
            "admin" => Ok(ProjectRole::Admin),
            _ => Err(ParseProjectRoleError(s.to_string())),
        }
    }
}

impl std::fmt::Display for ProjectRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ProjectRole {
    /// Every project role, lowest privilege first.
    pub const ALL: [ProjectRole; 5] = [
        ProjectRole::Viewer,
        ProjectRole::InteractiveViewer,
        ProjectRole::Editor,
        ProjectRole::Developer,
        ProjectRole::Admin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectRole::Viewer => "viewer",
            ProjectRole::InteractiveViewer => "interactive_viewer",
            ProjectRole::Editor => "editor",
            ProjectRole::Developer => "developer",
            ProjectRole::Admin => "admin",
        }
    }

    /// Check if this role has at least the permissions of another role
    pub fn includes(&self, other: &ProjectRole) -> bool {
        self >= other
    }
}

/// Role within an organization.
///
/// `Member` carries no elevated access on its own; every other role confers
/// some organization-wide access to the organization's projects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrganizationRole {
    Member,
    Viewer,
    InteractiveViewer,
    Editor,
    Developer,
    Admin,
}

/// Error type for parsing OrganizationRole from string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOrganizationRoleError(pub String);

impl std::fmt::Display for ParseOrganizationRoleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid organization role: {}", self.0)
    }
}

impl std::error::Error for ParseOrganizationRoleError {}

impl FromStr for OrganizationRole {
    type Err = ParseOrganizationRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "member" => Ok(OrganizationRole::Member),
            "viewer" => Ok(OrganizationRole::Viewer),
            "interactive_viewer" => Ok(OrganizationRole::InteractiveViewer),
            "editor" => Ok(OrganizationRole::Editor),
            "developer" => Ok(OrganizationRole::Developer),
            "admin" => Ok(OrganizationRole::Admin),
            _ => Err(ParseOrganizationRoleError(s.to_string())),
        }
    }
}

impl std::fmt::Display for OrganizationRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl OrganizationRole {
    pub const ALL: [OrganizationRole; 6] = [
        OrganizationRole::Member,
        OrganizationRole::Viewer,
        OrganizationRole::InteractiveViewer,
        OrganizationRole::Editor,
        OrganizationRole::Developer,
        OrganizationRole::Admin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrganizationRole::Member => "member",
            OrganizationRole::Viewer => "viewer",
            OrganizationRole::InteractiveViewer => "interactive_viewer",
            OrganizationRole::Editor => "editor",
            OrganizationRole::Developer => "developer",
            OrganizationRole::Admin => "admin",
        }
    }

    /// True for every role except `Member`.
    pub fn confers_access(&self) -> bool {
        !matches!(self, OrganizationRole::Member)
    }
}
