use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool, sqlite::SqlitePoolOptions};
use tessera_audit::{AuditEvent, AuditLog, AuditLogError, AuditLogFilter, AuditLogId};
use tessera_storage::{
    AddOrganizationMemberParams, CreateProjectGrantParams, CreateProjectParams, Organization,
    OrganizationId, OrganizationMember, Project, ProjectGrant, ProjectId, ProjectRole, Store,
    StoreError, User, UserId,
};
use uuid::Uuid;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// `~/.tessera/store.db` (creates dir with 0700 perms on unix)
    pub async fn open_default() -> Result<Self, StoreError> {
        let dir = dirs::home_dir()
            .ok_or_else(|| StoreError::Backend("no home dir".into()))?
            .join(".tessera");
        std::fs::create_dir_all(&dir).map_err(|e| StoreError::Backend(e.to_string()))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&dir, std::fs::Permissions::from_mode(0o700))
                .map_err(|e| StoreError::Backend(e.to_string()))?;
        }
        let path = dir.join("store.db");
        let url = format!("sqlite://{}?mode=rwc", path.to_string_lossy());
        Self::open(&url).await
    }

    pub async fn open_in_memory() -> Result<Self, StoreError> {
        Self::open("sqlite::memory:").await
    }

    pub async fn open(url: &str) -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(url)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        MIGRATOR
            .run(&pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(Self { pool })
    }
}

fn backend(e: impl std::fmt::Display) -> StoreError {
    StoreError::Backend(e.to_string())
}

/// Constraint violations on insert: duplicates are `AlreadyExists`, dangling
/// references are `NotFound`.
fn write_err(e: sqlx::Error) -> StoreError {
    let s = e.to_string();
    if s.contains("UNIQUE") {
        StoreError::AlreadyExists
    } else if s.contains("FOREIGN KEY") {
        StoreError::NotFound
    } else {
        StoreError::Backend(s)
    }
}

fn parse_uuid(s: &str) -> Result<Uuid, StoreError> {
    Uuid::try_parse(s).map_err(backend)
}

fn parse_ts(millis: i64) -> Result<DateTime<Utc>, StoreError> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| StoreError::Backend(format!("invalid timestamp: {millis}")))
}

type MemberRow = (String, String, String, String, i64);
type GrantRow = (String, String, String, String, i64);

fn member_from_row(
    (org_id, user_id, email, role, joined_at): MemberRow,
) -> Result<OrganizationMember, StoreError> {
    Ok(OrganizationMember {
        organization_id: OrganizationId(parse_uuid(&org_id)?),
        user_id: UserId(parse_uuid(&user_id)?),
        email,
        role: role.parse().map_err(backend)?,
        joined_at: parse_ts(joined_at)?,
    })
}

fn grant_from_row(
    (project_id, user_id, email, role, created_at): GrantRow,
) -> Result<ProjectGrant, StoreError> {
    Ok(ProjectGrant {
        project_id: ProjectId(parse_uuid(&project_id)?),
        user_id: UserId(parse_uuid(&user_id)?),
        email,
        role: role.parse().map_err(backend)?,
        created_at: parse_ts(created_at)?,
    })
}

const MEMBER_COLUMNS: &str = "SELECT m.organization_id, m.user_id, u.email, m.role, m.joined_at
     FROM organization_members m JOIN users u ON u.id = m.user_id";

const GRANT_COLUMNS: &str = "SELECT g.project_id, g.user_id, u.email, g.role, g.created_at
     FROM project_grants g JOIN users u ON u.id = g.user_id";

#[async_trait::async_trait]
impl Store for SqliteStore {
    // ───────────────────────────────── Users ──────────────────────────────────

    async fn create_user(&self, email: &str) -> Result<UserId, StoreError> {
        let id = Uuid::now_v7();
        sqlx::query("INSERT INTO users(id,email,created_at) VALUES(?,?,?)")
            .bind(id.to_string())
            .bind(email)
            .bind(Utc::now().timestamp_millis())
            .execute(&self.pool)
            .await
            .map_err(write_err)?;
        Ok(UserId(id))
    }

    async fn get_user_by_email(&self, email: &str) -> Result<User, StoreError> {
        let row = sqlx::query_as::<_, (String, String, i64)>(
            "SELECT id,email,created_at FROM users WHERE email=?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        match row {
            None => Err(StoreError::NotFound),
            Some((id, email, created_at)) => Ok(User {
                id: UserId(parse_uuid(&id)?),
                email,
                created_at: parse_ts(created_at)?,
            }),
        }
    }

    // ───────────────────────────── Organizations ──────────────────────────────

    async fn create_organization(&self, name: &str) -> Result<OrganizationId, StoreError> {
        let id = Uuid::now_v7();
        sqlx::query("INSERT INTO organizations(id,name,created_at) VALUES(?,?,?)")
            .bind(id.to_string())
            .bind(name)
            .bind(Utc::now().timestamp_millis())
            .execute(&self.pool)
            .await
            .map_err(write_err)?;
        Ok(OrganizationId(id))
    }

    async fn get_organization(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Organization, StoreError> {
        let row = sqlx::query_as::<_, (String, i64)>(
            "SELECT name,created_at FROM organizations WHERE id=?",
        )
        .bind(organization_id.0.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        match row {
            None => Err(StoreError::NotFound),
            Some((name, created_at)) => Ok(Organization {
                id: organization_id.clone(),
                name,
                created_at: parse_ts(created_at)?,
            }),
        }
    }

    async fn add_organization_member(
        &self,
        params: &AddOrganizationMemberParams,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO organization_members(organization_id,user_id,role,joined_at)
             VALUES(?,?,?,?)",
        )
        .bind(params.organization_id.0.to_string())
        .bind(params.user_id.0.to_string())
        .bind(params.role.as_str())
        .bind(Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await
        .map_err(write_err)?;
        Ok(())
    }

    async fn get_organization_member(
        &self,
        organization_id: &OrganizationId,
        user_id: &UserId,
    ) -> Result<OrganizationMember, StoreError> {
        let row = sqlx::query_as::<_, MemberRow>(&format!(
            "{MEMBER_COLUMNS} WHERE m.organization_id=? AND m.user_id=?"
        ))
        .bind(organization_id.0.to_string())
        .bind(user_id.0.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.map(member_from_row).unwrap_or(Err(StoreError::NotFound))
    }

    async fn list_organization_members(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Vec<OrganizationMember>, StoreError> {
        let rows = sqlx::query_as::<_, MemberRow>(&format!(
            "{MEMBER_COLUMNS} WHERE m.organization_id=? ORDER BY m.seq"
        ))
        .bind(organization_id.0.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.into_iter().map(member_from_row).collect()
    }

    // ──────────────────────────────── Projects ────────────────────────────────

    async fn create_project(&self, params: &CreateProjectParams) -> Result<ProjectId, StoreError> {
        let id = Uuid::now_v7();
        sqlx::query("INSERT INTO projects(id,organization_id,name,created_at) VALUES(?,?,?,?)")
            .bind(id.to_string())
            .bind(params.organization_id.0.to_string())
            .bind(&params.name)
            .bind(Utc::now().timestamp_millis())
            .execute(&self.pool)
            .await
            .map_err(write_err)?;
        Ok(ProjectId(id))
    }

    async fn get_project(&self, project_id: &ProjectId) -> Result<Project, StoreError> {
        let row = sqlx::query_as::<_, (String, String, i64)>(
            "SELECT organization_id,name,created_at FROM projects WHERE id=?",
        )
        .bind(project_id.0.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        match row {
            None => Err(StoreError::NotFound),
            Some((org_id, name, created_at)) => Ok(Project {
                id: project_id.clone(),
                organization_id: OrganizationId(parse_uuid(&org_id)?),
                name,
                created_at: parse_ts(created_at)?,
            }),
        }
    }

    // ───────────────────────────── Project Grants ─────────────────────────────

    async fn create_project_grant(
        &self,
        params: &CreateProjectGrantParams,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO project_grants(project_id,user_id,role,created_at) VALUES(?,?,?,?)",
        )
        .bind(params.project_id.0.to_string())
        .bind(params.user_id.0.to_string())
        .bind(params.role.as_str())
        .bind(Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await
        .map_err(write_err)?;
        Ok(())
    }

    async fn get_project_grant(
        &self,
        project_id: &ProjectId,
        user_id: &UserId,
    ) -> Result<ProjectGrant, StoreError> {
        let row = sqlx::query_as::<_, GrantRow>(&format!(
            "{GRANT_COLUMNS} WHERE g.project_id=? AND g.user_id=?"
        ))
        .bind(project_id.0.to_string())
        .bind(user_id.0.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.map(grant_from_row).unwrap_or(Err(StoreError::NotFound))
    }

    async fn list_project_grants(
        &self,
        project_id: &ProjectId,
    ) -> Result<Vec<ProjectGrant>, StoreError> {
        let rows = sqlx::query_as::<_, GrantRow>(&format!(
            "{GRANT_COLUMNS} WHERE g.project_id=? ORDER BY g.seq"
        ))
        .bind(project_id.0.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.into_iter().map(grant_from_row).collect()
    }

    async fn update_project_grant(
        &self,
        project_id: &ProjectId,
        user_id: &UserId,
        role: ProjectRole,
    ) -> Result<(), StoreError> {
        let res = sqlx::query("UPDATE project_grants SET role=? WHERE project_id=? AND user_id=?")
            .bind(role.as_str())
            .bind(project_id.0.to_string())
            .bind(user_id.0.to_string())
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        if res.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn remove_project_grant(
        &self,
        project_id: &ProjectId,
        user_id: &UserId,
    ) -> Result<(), StoreError> {
        let res = sqlx::query("DELETE FROM project_grants WHERE project_id=? AND user_id=?")
            .bind(project_id.0.to_string())
            .bind(user_id.0.to_string())
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        if res.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

// ─────────────────────────────────── Audit ────────────────────────────────────

type AuditRow = (
    String,
    i64,
    Option<String>,
    String,
    String,
    String,
    String,
    Option<String>,
    Option<String>,
);

const AUDIT_COLUMNS: &str = "SELECT id,timestamp,actor_user_id,action,project_id,target_user_id,result,reason,details
     FROM audit_log";

fn db_err(e: impl std::fmt::Display) -> AuditLogError {
    AuditLogError::Database(e.to_string())
}

fn audit_from_row(
    (id, timestamp, actor, action, project_id, target, result, reason, details): AuditRow,
) -> Result<AuditEvent, AuditLogError> {
    Ok(AuditEvent {
        id: id.parse().map_err(db_err)?,
        timestamp: DateTime::from_timestamp_millis(timestamp)
            .ok_or_else(|| db_err(format!("invalid timestamp: {timestamp}")))?,
        actor_user_id: actor
            .map(|a| Uuid::try_parse(&a).map(UserId))
            .transpose()
            .map_err(db_err)?,
        action: action.parse().map_err(db_err)?,
        project_id: ProjectId(Uuid::try_parse(&project_id).map_err(db_err)?),
        target_user_id: UserId(Uuid::try_parse(&target).map_err(db_err)?),
        result: result.parse().map_err(db_err)?,
        reason,
        details: details
            .map(|d| serde_json::from_str(&d))
            .transpose()
            .map_err(db_err)?,
    })
}

#[async_trait::async_trait]
impl AuditLog for SqliteStore {
    async fn record(&self, event: AuditEvent) -> Result<(), AuditLogError> {
        let details = event
            .details
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(db_err)?;
        sqlx::query(
            "INSERT INTO audit_log(id,timestamp,actor_user_id,action,project_id,target_user_id,result,reason,details)
             VALUES(?,?,?,?,?,?,?,?,?)",
        )
        .bind(event.id.to_string())
        .bind(event.timestamp.timestamp_millis())
        .bind(event.actor_user_id.map(|u| u.to_string()))
        .bind(event.action.to_string())
        .bind(event.project_id.to_string())
        .bind(event.target_user_id.to_string())
        .bind(event.result.to_string())
        .bind(event.reason)
        .bind(details)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn query(&self, filter: AuditLogFilter) -> Result<Vec<AuditEvent>, AuditLogError> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(AUDIT_COLUMNS);
        qb.push(" WHERE 1=1");
        if let Some(project_id) = filter.project_id {
            qb.push(" AND project_id = ").push_bind(project_id.0.to_string());
        }
        if let Some(user_id) = filter.target_user_id {
            qb.push(" AND target_user_id = ").push_bind(user_id.0.to_string());
        }
        if let Some(action) = filter.action {
            qb.push(" AND action = ").push_bind(action.to_string());
        }
        if let Some(result) = filter.result {
            qb.push(" AND result = ").push_bind(result.to_string());
        }
        qb.push(" ORDER BY timestamp DESC, id DESC");
        if let Some(limit) = filter.limit {
            qb.push(" LIMIT ").push_bind(i64::from(limit));
        }

        let rows = qb
            .build_query_as::<AuditRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.into_iter().map(audit_from_row).collect()
    }

    async fn get(&self, id: AuditLogId) -> Result<AuditEvent, AuditLogError> {
        let row = sqlx::query_as::<_, AuditRow>(&format!("{AUDIT_COLUMNS} WHERE id=?"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        match row {
            None => Err(AuditLogError::NotFound(id)),
            Some(row) => audit_from_row(row),
        }
    }
}
