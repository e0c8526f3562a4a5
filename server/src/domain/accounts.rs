//! Accounts, workspaces and memberships
//!
//! Signup creates the user, default settings and a personal workspace in one
//! transaction. Password hashing runs on the blocking pool.

use crate::data::sqlite::repositories::{user, workspace};
use crate::data::types::{MembershipRow, UserRow, UserSettingsRow, WorkspaceRow, WorkspaceWithRole};
use crate::core::constants::MIN_PASSWORD_LEN;
use crate::utils::crypto::{hash_password, verify_password};
use crate::utils::time::now_secs;

use super::engine::TaskEngine;
use super::error::{DomainError, DomainResult};

const PERSONAL_WORKSPACE_NAME: &str = "Personal";

/// A user with their settings, as returned by signup and login
#[derive(Debug, Clone)]
pub struct Account {
    pub user: UserRow,
    pub settings: UserSettingsRow,
}

fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

async fn run_blocking<T, F>(f: F) -> DomainResult<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| DomainError::Internal(format!("blocking task failed: {e}")))
}

impl TaskEngine {
    pub async fn signup(
        &self,
        email: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> DomainResult<Account> {
        let email = normalize_email(email);
        if password.chars().count() < MIN_PASSWORD_LEN as usize {
            return Err(DomainError::validation(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        let full_name = full_name.map(str::trim).filter(|n| !n.is_empty());

        let owned = password.to_string();
        let hash = run_blocking(move || hash_password(&owned))
            .await?
            .map_err(|e| DomainError::Internal(format!("password hashing failed: {e}")))?;

        let now = now_secs();
        let mut tx = self.pool.begin().await?;
        let row = user::create_user(&mut tx, &email, &hash, full_name, now).await?;
        let settings = user::create_settings(&mut tx, row.id, now).await?;
        let personal =
            workspace::create_workspace(&mut tx, PERSONAL_WORKSPACE_NAME, true, row.id, now).await?;
        workspace::upsert_member(&mut tx, personal.id, row.id, "owner", now).await?;
        tx.commit().await?;

        tracing::info!(user_id = row.id, "User signed up");
        Ok(Account {
            user: row,
            settings,
        })
    }

    /// Check credentials. Unknown email and wrong password look the same.
    pub async fn login(&self, email: &str, password: &str) -> DomainResult<Account> {
        let invalid = || DomainError::Unauthorized("Invalid email or password".into());
        let email = normalize_email(email);

        let mut conn = self.pool.acquire().await?;
        let row = user::get_user_by_email(&mut conn, &email)
            .await?
            .filter(|u| u.is_active)
            .ok_or_else(invalid)?;
        drop(conn);

        let hash = row.password_hash.clone();
        let owned = password.to_string();
        if !run_blocking(move || verify_password(&owned, &hash)).await? {
            return Err(invalid());
        }

        let mut conn = self.pool.acquire().await?;
        let settings = match user::get_settings(&mut conn, row.id).await? {
            Some(s) => s,
            None => user::create_settings(&mut conn, row.id, now_secs()).await?,
        };
        tracing::debug!(user_id = row.id, "User logged in");
        Ok(Account {
            user: row,
            settings,
        })
    }

    /// Active user by id, for token authentication
    pub async fn active_user(&self, user_id: i64) -> DomainResult<UserRow> {
        let mut conn = self.pool.acquire().await?;
        user::get_user(&mut conn, user_id)
            .await?
            .filter(|u| u.is_active)
            .ok_or_else(|| DomainError::Unauthorized("User not found or inactive".into()))
    }

    pub async fn load_workspace_memberships(
        &self,
        user_id: i64,
    ) -> DomainResult<Vec<MembershipRow>> {
        let mut conn = self.pool.acquire().await?;
        Ok(workspace::list_memberships(&mut conn, user_id).await?)
    }

    pub async fn list_workspaces(&self, user_id: i64) -> DomainResult<Vec<WorkspaceWithRole>> {
        let mut conn = self.pool.acquire().await?;
        Ok(workspace::list_for_user(&mut conn, user_id).await?)
    }

    /// Create a team workspace owned by the caller
    pub async fn create_workspace(&self, user_id: i64, name: &str) -> DomainResult<WorkspaceRow> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("name must not be empty"));
        }
        let now = now_secs();
        let mut tx = self.pool.begin().await?;
        let ws = workspace::create_workspace(&mut tx, name, false, user_id, now).await?;
        workspace::upsert_member(&mut tx, ws.id, user_id, "owner", now).await?;
        tx.commit().await?;
        tracing::debug!(workspace_id = ws.id, user_id, "Workspace created");
        Ok(ws)
    }

    /// Add or reactivate a member. Only members may add members.
    pub async fn add_workspace_member(
        &self,
        user_id: i64,
        workspace_id: i64,
        member_id: i64,
        role: Option<&str>,
    ) -> DomainResult<()> {
        let mut tx = self.pool.begin().await?;
        workspace::get_workspace(&mut tx, workspace_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Workspace not found"))?;
        if !workspace::is_active_member(&mut tx, user_id, workspace_id).await? {
            return Err(DomainError::forbidden("Not a member of this workspace"));
        }
        user::get_user(&mut tx, member_id)
            .await?
            .filter(|u| u.is_active)
            .ok_or_else(|| DomainError::not_found("User not found"))?;
        let role = role.map(str::trim).filter(|r| !r.is_empty()).unwrap_or("member");
        workspace::upsert_member(&mut tx, workspace_id, member_id, role, now_secs()).await?;
        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::engine::testing::engine;

    #[tokio::test]
    async fn test_signup_creates_personal_workspace() {
        let (engine, _) = engine().await;
        let account = engine
            .signup(" Ann@Example.com ", "password123", Some("Ann"))
            .await
            .unwrap();
        assert_eq!(account.user.email, "ann@example.com");
        assert_eq!(account.settings.timezone, "UTC");

        let workspaces = engine.list_workspaces(account.user.id).await.unwrap();
        assert_eq!(workspaces.len(), 1);
        assert!(workspaces[0].is_personal);
        assert_eq!(workspaces[0].role, "owner");

        assert!(matches!(
            engine.signup("ann@example.com", "password123", None).await,
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            engine.signup("bob@example.com", "short", None).await,
            Err(DomainError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_login() {
        let (engine, _) = engine().await;
        let account = engine
            .signup("ann@example.com", "password123", None)
            .await
            .unwrap();

        let logged_in = engine.login("ANN@example.com", "password123").await.unwrap();
        assert_eq!(logged_in.user.id, account.user.id);
        assert!(matches!(
            engine.login("ann@example.com", "wrong-password").await,
            Err(DomainError::Unauthorized(_))
        ));
        assert!(matches!(
            engine.login("nobody@example.com", "password123").await,
            Err(DomainError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_workspace_membership_management() {
        let (engine, _) = engine().await;
        let ann = engine.signup("ann@example.com", "password123", None).await.unwrap().user.id;
        let bob = engine.signup("bob@example.com", "password123", None).await.unwrap().user.id;

        let ws = engine.create_workspace(ann, " Team ").await.unwrap();
        assert_eq!(ws.name, "Team");
        assert!(matches!(
            engine.add_workspace_member(bob, ws.id, bob, None).await,
            Err(DomainError::Forbidden(_))
        ));
        engine.add_workspace_member(ann, ws.id, bob, None).await.unwrap();

        let memberships = engine.load_workspace_memberships(bob).await.unwrap();
        assert!(memberships.iter().any(|m| m.workspace_id == ws.id && m.role == "member"));
        assert!(engine.active_user(bob).await.is_ok());
        assert!(matches!(
            engine.active_user(9999).await,
            Err(DomainError::Unauthorized(_))
        ));
    }
}
