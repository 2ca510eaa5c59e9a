//! Public client surface and entity hydration.
//!
//! Every getter requires an established session, fetches one fragment,
//! parses it, and resolves nested entities through strictly sequential
//! dependent fetches: a post hydrates its thread, which hydrates its
//! author. Nothing runs in parallel because each step's request derives
//! from the previous step's parsed output, and nothing is retried.

use crate::bypass::{ChallengeSolver, PassthroughSolver};
use crate::error::{ClientError, Result};
use crate::extract;
use crate::models::{Category, Member, Post, Thread, ThreadListing};
use crate::session::Session;
use crate::transport::DEFAULT_ORIGIN;
use chrono::Utc;
use scraper::Html;

/// Read-only forum client. One logical session per instance; `connect()`
/// must complete before any entity operation.
pub struct ForumClient {
    origin: String,
    solver: Box<dyn ChallengeSolver>,
    session: Option<Session>,
}

impl ForumClient {
    /// Client against the default forum origin.
    pub fn new() -> Self {
        Self::with_origin(DEFAULT_ORIGIN)
    }

    /// Client against a specific forum origin.
    pub fn with_origin(origin: impl Into<String>) -> Self {
        ForumClient {
            origin: origin.into().trim_end_matches('/').to_string(),
            solver: Box::new(PassthroughSolver),
            session: None,
        }
    }

    /// Install the anti-automation challenge solver used when `connect()`
    /// is asked to bypass.
    pub fn set_solver(&mut self, solver: Box<dyn ChallengeSolver>) {
        self.solver = solver;
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    /// Anti-forgery token captured at connect time, if connected.
    pub fn csrf_token(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.csrf_token())
    }

    /// Establish the authenticated session. Any failure leaves the client
    /// disconnected; a previous session is discarded up front.
    pub async fn connect(
        &mut self,
        user_agent: &str,
        cookies: &[(&str, &str)],
        do_bypass: bool,
    ) -> Result<()> {
        self.session = None;
        let solver = if do_bypass {
            Some(self.solver.as_ref())
        } else {
            None
        };
        let session = Session::establish(&self.origin, user_agent, cookies, solver).await?;
        self.session = Some(session);
        Ok(())
    }

    fn session(&self) -> Result<&Session> {
        self.session.as_ref().ok_or(ClientError::NotConnected)
    }

    /// The member the session is signed in as.
    pub async fn get_current_member(&self) -> Result<Option<Member>> {
        let session = self.session()?;
        let resp = session.transport().get_page("/account/").await?;
        resp.error_for_status()?;

        let member_id = {
            let doc = Html::parse_document(&resp.html());
            extract::extract_current_member_id(&doc)?
        };
        self.get_member(member_id).await
    }

    /// A member profile by id. `Ok(None)` on 404 or a missing profile
    /// anchor.
    pub async fn get_member(&self, id: u64) -> Result<Option<Member>> {
        let session = self.session()?;
        let resp = session
            .transport()
            .get_fragment(&format!("/members/{id}/"))
            .await?;
        if resp.is_not_found() {
            return Ok(None);
        }
        resp.error_for_status()?;

        let parts = {
            let doc = Html::parse_document(&resp.html());
            match extract::extract_member(&doc) {
                Some(parts) => parts,
                None => return Ok(None),
            }
        };

        Ok(Some(Member {
            id,
            username: parts.username,
            role: parts.role,
            roles: parts.roles,
            message_count: parts.message_count,
            reaction_score: parts.reaction_score,
            trophy_points: parts.trophy_points,
            last_activity: parts.last_activity.unwrap_or_else(Utc::now),
        }))
    }

    /// A thread by id, with its author hydrated. Author hydration failure
    /// degrades to a stub member and never surfaces as an error.
    pub async fn get_thread(&self, id: u64) -> Result<Option<Thread>> {
        let session = self.session()?;
        let resp = session
            .transport()
            .get_fragment(&format!("/threads/{id}/"))
            .await?;
        if resp.is_not_found() {
            return Ok(None);
        }
        resp.error_for_status()?;

        let parts = {
            let doc = Html::parse_document(&resp.html());
            match extract::extract_thread(&doc)? {
                Some(parts) => parts,
                None => return Ok(None),
            }
        };

        let author = self.author_or_stub(parts.author_id, &parts.author_name).await;

        Ok(Some(Thread {
            id,
            title: parts.title,
            author,
            date: parts.date.unwrap_or_else(Utc::now),
            category_id: parts.category_id,
            reply_count: parts.posts.len().saturating_sub(1),
            posts: parts.posts,
            is_locked: parts.is_locked,
        }))
    }

    /// A post by id, with its author and its fully hydrated parent thread.
    /// A post without a resolvable parent thread has no representation:
    /// that failure propagates instead of degrading.
    pub async fn get_post(&self, id: u64) -> Result<Option<Post>> {
        let session = self.session()?;
        let resp = session
            .transport()
            .get_fragment(&format!("/posts/{id}/"))
            .await?;
        if resp.is_not_found() {
            return Ok(None);
        }
        resp.error_for_status()?;

        let parts = {
            let doc = Html::parse_document(&resp.html());
            match extract::extract_post(&doc, id)? {
                Some(parts) => parts,
                None => return Ok(None),
            }
        };

        let author = self.author_or_stub(parts.author_id, &parts.author_name).await;

        let thread = self.get_thread(parts.thread_id).await?.ok_or_else(|| {
            ClientError::Protocol(format!(
                "parent thread {} for post {id} not found",
                parts.thread_id
            ))
        })?;

        Ok(Some(Post {
            id,
            author,
            thread,
            date: parts.date,
            content: parts.content,
            text_content: parts.text_content,
        }))
    }

    /// A category by id. Always a record for any page the server renders;
    /// `Ok(None)` only on 404.
    pub async fn get_category(&self, id: u64) -> Result<Option<Category>> {
        let session = self.session()?;
        let resp = session
            .transport()
            .get_fragment(&format!("/forums/{id}/"))
            .await?;
        if resp.is_not_found() {
            return Ok(None);
        }
        resp.error_for_status()?;

        let parts = {
            let doc = Html::parse_document(&resp.html());
            extract::extract_category(&doc)
        };

        Ok(Some(Category {
            id,
            title: parts.title,
            description: parts.description,
        }))
    }

    /// One page of a category's thread list, partitioned into pinned and
    /// regular ids in source row order.
    pub async fn get_threads(&self, category_id: u64, page: u32) -> Result<Option<ThreadListing>> {
        let session = self.session()?;
        let resp = session
            .transport()
            .get_fragment(&format!("/forums/{category_id}/page-{page}"))
            .await?;
        if resp.is_not_found() {
            return Ok(None);
        }
        resp.error_for_status()?;

        let doc = Html::parse_document(&resp.html());
        Ok(Some(extract::extract_thread_listing(&doc)))
    }

    /// Hydrate an author member, degrading to a stub built from the inline
    /// link when the nested fetch fails or the profile is gone.
    async fn author_or_stub(&self, id: u64, name: &str) -> Member {
        match self.get_member(id).await {
            Ok(Some(member)) => member,
            Ok(None) => {
                tracing::warn!(author_id = id, "author profile not found, using stub");
                Member::stub(id, name)
            }
            Err(e) => {
                tracing::warn!(author_id = id, error = %e, "author hydration failed, using stub");
                Member::stub(id, name)
            }
        }
    }
}

impl Default for ForumClient {
    fn default() -> Self {
        Self::new()
    }
}
