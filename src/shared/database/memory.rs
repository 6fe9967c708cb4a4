// 인메모리 저장소
// In-process implementation of every store trait with the same semantics as
// the Postgres repositories, cascades included. Backs the test-suite and
// `STORE=memory` local runs.
use std::collections::HashMap;
use std::sync::Arc;
use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use uuid::Uuid;
use crate::domains::auth::models::{
    RefreshToken, RefreshTokenCreate, Session, SessionCreate, TokenOwner, User,
};
use crate::shared::database::store::{
    RefreshTokenStore, RetentionStore, SessionStore, SnippetPurge, UserStore,
};

/// 스니펫 (보존 정책 대상 필드만)
#[derive(Debug, Clone)]
pub struct SnippetRecord {
    pub id: i64,
    pub user_id: i64,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// 스니펫 변경 이력
#[derive(Debug, Clone)]
pub struct SnippetHistoryRecord {
    pub id: i64,
    pub snippet_id: i64,
    pub changed_at: DateTime<Utc>,
}

#[derive(Default)]
struct MemoryState {
    next_id: i64,
    users: HashMap<i64, User>,
    user_roles: Vec<(i64, i64)>,
    sessions: HashMap<Uuid, Session>,
    refresh_tokens: HashMap<i64, RefreshToken>,
    snippets: HashMap<i64, SnippetRecord>,
    snippet_history: HashMap<i64, SnippetHistoryRecord>,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn remove_snippets_where(&mut self, doomed: impl Fn(&SnippetRecord) -> bool) -> SnippetPurge {
        let ids: Vec<i64> = self
            .snippets
            .values()
            .filter(|s| doomed(s))
            .map(|s| s.id)
            .collect();

        let before = self.snippet_history.len();
        self.snippet_history.retain(|_, h| !ids.contains(&h.snippet_id));
        let history = (before - self.snippet_history.len()) as u64;

        for id in &ids {
            self.snippets.remove(id);
        }

        SnippetPurge {
            snippets: ids.len() as u64,
            history,
        }
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // 픽스처 (사용자/스니펫 CRUD는 이 모듈 밖의 책임)
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    pub fn insert_user(
        &self,
        email: &str,
        username: &str,
        password_hash: &str,
        created_at: DateTime<Utc>,
    ) -> Result<User> {
        let mut state = self.state.lock();
        if state.users.values().any(|u| u.email == email || u.username == username) {
            bail!("User already exists: {}", email);
        }

        let user = User {
            id: state.next_id(),
            email: email.to_string(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            created_at,
            deleted_at: None,
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    pub fn soft_delete_user(&self, user_id: i64, at: DateTime<Utc>) -> Result<()> {
        let mut state = self.state.lock();
        match state.users.get_mut(&user_id) {
            Some(user) => {
                user.deleted_at = Some(at);
                Ok(())
            }
            None => bail!("User not found: id={}", user_id),
        }
    }

    pub fn assign_role(&self, user_id: i64, role_id: i64) {
        self.state.lock().user_roles.push((user_id, role_id));
    }

    pub fn insert_snippet(&self, user_id: i64, deleted_at: Option<DateTime<Utc>>) -> i64 {
        let mut state = self.state.lock();
        let id = state.next_id();
        state.snippets.insert(id, SnippetRecord { id, user_id, deleted_at });
        id
    }

    pub fn insert_history(&self, snippet_id: i64, changed_at: DateTime<Utc>) -> i64 {
        let mut state = self.state.lock();
        let id = state.next_id();
        state
            .snippet_history
            .insert(id, SnippetHistoryRecord { id, snippet_id, changed_at });
        id
    }

    pub fn history(&self) -> Vec<SnippetHistoryRecord> {
        self.state.lock().snippet_history.values().cloned().collect()
    }

    pub fn snippets(&self) -> Vec<SnippetRecord> {
        self.state.lock().snippets.values().cloned().collect()
    }

    pub fn user_exists(&self, user_id: i64) -> bool {
        self.state.lock().users.contains_key(&user_id)
    }

    pub fn role_links(&self, user_id: i64) -> usize {
        self.state
            .lock()
            .user_roles
            .iter()
            .filter(|(uid, _)| *uid == user_id)
            .count()
    }

    pub fn sessions_for_user(&self, user_id: i64) -> Vec<Session> {
        self.state
            .lock()
            .sessions
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect()
    }

    pub fn refresh_tokens_for_user(&self, user_id: i64) -> Vec<RefreshToken> {
        self.state
            .lock()
            .refresh_tokens
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect()
    }

    /// 마지막 활동 시각 강제 설정 (유휴 세션 시나리오용)
    pub fn set_last_activity(&self, session_id: Uuid, at: DateTime<Utc>) {
        if let Some(session) = self.state.lock().sessions.get_mut(&session_id) {
            session.last_activity = at;
        }
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self.state.lock().users.values().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>> {
        Ok(self.state.lock().users.get(&id).cloned())
    }
}

#[async_trait]
impl RefreshTokenStore for MemoryStore {
    async fn create_refresh_token(&self, data: RefreshTokenCreate) -> Result<RefreshToken> {
        let mut state = self.state.lock();
        if !state.users.contains_key(&data.user_id) {
            bail!("Failed to create refresh token: unknown user {}", data.user_id);
        }

        let token = RefreshToken {
            id: state.next_id(),
            user_id: data.user_id,
            session_id: data.session_id,
            token_hash: data.token_hash,
            device_info: data.device_info,
            expires_at: data.expires_at,
            created_at: data.created_at,
            revoked: false,
        };
        state.refresh_tokens.insert(token.id, token.clone());
        Ok(token)
    }

    async fn find_refresh_token(&self, token_hash: &str) -> Result<Option<RefreshToken>> {
        Ok(self
            .state
            .lock()
            .refresh_tokens
            .values()
            .find(|t| t.token_hash == token_hash)
            .cloned())
    }

    async fn revoke_refresh_token(&self, token_hash: &str) -> Result<bool> {
        let mut state = self.state.lock();
        let mut matched = false;
        for token in state.refresh_tokens.values_mut().filter(|t| t.token_hash == token_hash) {
            token.revoked = true;
            matched = true;
        }
        Ok(matched)
    }

    async fn revoke_refresh_tokens(&self, owner: TokenOwner) -> Result<u64> {
        let mut state = self.state.lock();
        let mut revoked = 0;
        for token in state.refresh_tokens.values_mut() {
            let owned = match owner {
                TokenOwner::User(user_id) => token.user_id == user_id,
                TokenOwner::Session(session_id) => token.session_id == Some(session_id),
            };
            if owned && !token.revoked {
                token.revoked = true;
                revoked += 1;
            }
        }
        Ok(revoked)
    }

    async fn delete_stale_refresh_tokens(
        &self,
        now: DateTime<Utc>,
        revoked_before: DateTime<Utc>,
    ) -> Result<u64> {
        let mut state = self.state.lock();
        let before = state.refresh_tokens.len();
        state.refresh_tokens.retain(|_, t| {
            !(t.expires_at < now || (t.revoked && t.created_at < revoked_before))
        });
        Ok((before - state.refresh_tokens.len()) as u64)
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn create_session(&self, data: SessionCreate) -> Result<Session> {
        let mut state = self.state.lock();
        if !state.users.contains_key(&data.user_id) {
            bail!("Failed to create session: unknown user {}", data.user_id);
        }

        let session = Session {
            id: data.id,
            user_id: data.user_id,
            device_info: data.device_info,
            ip_hash: data.ip_hash,
            user_agent: data.user_agent,
            active: true,
            last_activity: data.created_at,
            created_at: data.created_at,
            expires_at: data.expires_at,
            logged_out_at: None,
        };
        state.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn find_session(&self, id: Uuid) -> Result<Option<Session>> {
        Ok(self.state.lock().sessions.get(&id).cloned())
    }

    async fn list_active_sessions(&self, user_id: i64, now: DateTime<Utc>) -> Result<Vec<Session>> {
        let mut sessions: Vec<Session> = self
            .state
            .lock()
            .sessions
            .values()
            .filter(|s| s.user_id == user_id && s.active && s.expires_at > now)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.last_activity.cmp(&a.last_activity));
        Ok(sessions)
    }

    async fn touch_session(&self, id: Uuid, now: DateTime<Utc>) -> Result<bool> {
        let mut state = self.state.lock();
        match state.sessions.get_mut(&id) {
            Some(session) if session.active => {
                session.last_activity = session.last_activity.max(now);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn close_session(&self, id: Uuid, now: DateTime<Utc>) -> Result<bool> {
        let mut state = self.state.lock();
        match state.sessions.get_mut(&id) {
            Some(session) if session.active => {
                session.active = false;
                session.logged_out_at = Some(now);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn close_sessions_for_user(&self, user_id: i64, now: DateTime<Utc>) -> Result<u64> {
        let mut state = self.state.lock();
        let mut closed = 0;
        for session in state
            .sessions
            .values_mut()
            .filter(|s| s.user_id == user_id && s.active)
        {
            session.active = false;
            session.logged_out_at = Some(now);
            closed += 1;
        }
        Ok(closed)
    }

    async fn sweep_idle_sessions(
        &self,
        idle_before: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<u64> {
        let mut state = self.state.lock();
        let mut swept = 0;
        for session in state
            .sessions
            .values_mut()
            .filter(|s| s.active && s.last_activity < idle_before)
        {
            session.active = false;
            session.logged_out_at = Some(now);
            swept += 1;
        }
        Ok(swept)
    }

    async fn purge_sessions(
        &self,
        now: DateTime<Utc>,
        logged_out_before: DateTime<Utc>,
    ) -> Result<u64> {
        let mut state = self.state.lock();
        let doomed: Vec<Uuid> = state
            .sessions
            .values()
            .filter(|s| {
                s.expires_at < now || s.logged_out_at.is_some_and(|at| at < logged_out_before)
            })
            .map(|s| s.id)
            .collect();

        // ON DELETE CASCADE
        state
            .refresh_tokens
            .retain(|_, t| !t.session_id.is_some_and(|sid| doomed.contains(&sid)));
        for id in &doomed {
            state.sessions.remove(id);
        }
        Ok(doomed.len() as u64)
    }
}

#[async_trait]
impl RetentionStore for MemoryStore {
    async fn delete_history_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let mut state = self.state.lock();
        let before = state.snippet_history.len();
        state.snippet_history.retain(|_, h| h.changed_at >= cutoff);
        Ok((before - state.snippet_history.len()) as u64)
    }

    async fn purge_deleted_snippets(&self, cutoff: DateTime<Utc>) -> Result<SnippetPurge> {
        let mut state = self.state.lock();
        Ok(state.remove_snippets_where(|s| s.deleted_at.is_some_and(|at| at < cutoff)))
    }

    async fn purge_deleted_users(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let mut state = self.state.lock();
        let doomed: Vec<i64> = state
            .users
            .values()
            .filter(|u| u.deleted_at.is_some_and(|at| at < cutoff))
            .map(|u| u.id)
            .collect();
        if doomed.is_empty() {
            return Ok(0);
        }

        state.refresh_tokens.retain(|_, t| !doomed.contains(&t.user_id));
        state.sessions.retain(|_, s| !doomed.contains(&s.user_id));
        state.user_roles.retain(|(uid, _)| !doomed.contains(uid));
        // 소유 스니펫과 이력은 CASCADE
        state.remove_snippets_where(|s| doomed.contains(&s.user_id));
        for id in &doomed {
            state.users.remove(id);
        }
        Ok(doomed.len() as u64)
    }
}
