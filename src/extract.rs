//! Per-entity fragment parsing.
//!
//! Each entity kind binds to an anchor in the markup; a missing optional
//! anchor means not-found, a missing required anchor or attribute is a
//! protocol error. Parsing is pure: these functions turn a parsed document
//! into intermediate "parts" carrying everything the hydration chain in
//! `client` needs for its nested fetches, and never touch the network.

use crate::error::{ClientError, Result};
use crate::models::ThreadListing;
use chrono::{DateTime, Utc};
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};

/// Fields read off a member profile fragment.
#[derive(Debug, Clone)]
pub struct MemberParts {
    pub username: String,
    pub role: String,
    pub roles: Vec<String>,
    pub message_count: u64,
    pub reaction_score: u64,
    pub trophy_points: u64,
    /// None when the fragment has no machine-readable activity time;
    /// the caller substitutes the fetch time.
    pub last_activity: Option<DateTime<Utc>>,
}

/// Fields read off a thread fragment, before author hydration.
#[derive(Debug, Clone)]
pub struct ThreadParts {
    pub title: String,
    pub author_id: u64,
    /// Inline link text, kept for the stub-author fallback.
    pub author_name: String,
    pub date: Option<DateTime<Utc>>,
    pub category_id: u64,
    /// Post ids in document order.
    pub posts: Vec<u64>,
    pub is_locked: bool,
}

/// Fields read off a post fragment, before author and thread hydration.
#[derive(Debug, Clone)]
pub struct PostParts {
    pub author_id: u64,
    pub author_name: String,
    /// Owning thread id from the document root's content key.
    pub thread_id: u64,
    pub date: Option<DateTime<Utc>>,
    pub content: String,
    pub text_content: String,
}

/// Fields read off a category page.
#[derive(Debug, Clone)]
pub struct CategoryParts {
    pub title: String,
    pub description: String,
}

// ── Member ──────────────────────────────────────────────────────────────────

/// Parse a member profile fragment. Anchor is the member header block;
/// absence means the member does not exist in this fragment.
pub fn extract_member(doc: &Html) -> Option<MemberParts> {
    let anchor = Selector::parse(".memberHeader-main").unwrap();
    doc.select(&anchor).next()?;

    let username_sel = Selector::parse(".memberHeader-name .username").unwrap();
    let username = doc
        .select(&username_sel)
        .next()
        .map(|el| text_of(&el))
        .unwrap_or_default();

    let role_sel = Selector::parse(".userTitle").unwrap();
    let role = doc
        .select(&role_sel)
        .next()
        .map(|el| text_of(&el))
        .unwrap_or_default();

    let roles = extract_roles(doc);

    // Stats come left-to-right from a fixed-position label/value list:
    // messages, reaction score, trophy points.
    let stat_sel = Selector::parse(".memberHeader-stats .pairs dd").unwrap();
    let stats: Vec<ElementRef<'_>> = doc.select(&stat_sel).collect();
    let stat = |i: usize| {
        stats
            .get(i)
            .map(|el| parse_count(&text_of(el)))
            .unwrap_or(0)
    };

    let time_sel = Selector::parse(".memberHeader-blurb time").unwrap();
    let last_activity = doc
        .select(&time_sel)
        .next()
        .and_then(|el| el.value().attr("datetime"))
        .and_then(parse_datetime);

    Some(MemberParts {
        username,
        role,
        roles,
        message_count: stat(0),
        reaction_score: stat(1),
        trophy_points: stat(2),
        last_activity,
    })
}

/// Badge texts: the banner container's direct children, trimmed, with
/// blank and whitespace-only entries dropped, order preserved.
fn extract_roles(doc: &Html) -> Vec<String> {
    let banners_sel = Selector::parse(".memberHeader-banners").unwrap();
    let Some(container) = doc.select(&banners_sel).next() else {
        return Vec::new();
    };

    let mut roles = Vec::new();
    for child in container.children() {
        let text: String = match child.value() {
            Node::Text(t) => t.trim().to_string(),
            Node::Element(_) => ElementRef::wrap(child)
                .map(|el| el.text().collect::<String>())
                .unwrap_or_default(),
            _ => continue,
        };
        let text = text.trim();
        if !text.is_empty() {
            roles.push(text.to_string());
        }
    }
    roles
}

// ── Thread ──────────────────────────────────────────────────────────────────

/// Parse a thread fragment.
///
/// An inline error marker block means not-found. The author link and the
/// forum breadcrumb are required: a thread without an attributable author
/// or a resolvable category has no valid representation.
pub fn extract_thread(doc: &Html) -> Result<Option<ThreadParts>> {
    let error_sel = Selector::parse(".error").unwrap();
    if doc.select(&error_sel).next().is_some() {
        return Ok(None);
    }

    let title_sel = Selector::parse(".p-title-value").unwrap();
    let title = doc
        .select(&title_sel)
        .next()
        .map(|el| text_of(&el))
        .unwrap_or_default();

    // Body-header username link first, message-attribution link second.
    let author = first_match(
        doc,
        &[".p-body-header .username", ".message-attribution .username"],
    );
    let (author_id, author_name) = match author.and_then(|el| {
        attr_u64(&el, "data-user-id").map(|id| (id, text_of(&el)))
    }) {
        Some(pair) => pair,
        None => {
            return Err(ClientError::Protocol(
                "thread author link missing or without user id".to_string(),
            ))
        }
    };

    let date_sel = Selector::parse(".message-attribution-main time").unwrap();
    let date = doc
        .select(&date_sel)
        .next()
        .and_then(|el| el.value().attr("datetime"))
        .and_then(parse_datetime);

    let category_id = extract_category_id(doc)?;

    let post_sel = Selector::parse(".message--post").unwrap();
    let key_re = Regex::new(r"post-(\d+)").unwrap();
    let posts: Vec<u64> = doc
        .select(&post_sel)
        .filter_map(|el| {
            let key = el.value().attr("data-content")?;
            key_re.captures(key)?.get(1)?.as_str().parse().ok()
        })
        .collect();

    let locked_sel = Selector::parse("dl.blockStatus").unwrap();
    let is_locked = doc.select(&locked_sel).next().is_some();

    Ok(Some(ThreadParts {
        title,
        author_id,
        author_name,
        date,
        category_id,
        posts,
        is_locked,
    }))
}

/// Category id from the last forum-scoped breadcrumb link.
///
/// No breadcrumb link is a hard failure: the only alternative source for
/// the category lives in a browser execution context this client does not
/// have.
fn extract_category_id(doc: &Html) -> Result<u64> {
    let crumb_sel = Selector::parse(r#".p-breadcrumbs li a[href*="/forums/"]"#).unwrap();
    let last = doc.select(&crumb_sel).last().ok_or_else(|| {
        ClientError::Protocol("no forum breadcrumb link on thread page".to_string())
    })?;

    let href = last.value().attr("href").unwrap_or("");
    let re = Regex::new(r"forums/(\d+)").unwrap();
    re.captures(href)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .ok_or_else(|| {
            ClientError::Protocol(format!(
                "breadcrumb link has no numeric forum segment: {href}"
            ))
        })
}

// ── Post ────────────────────────────────────────────────────────────────────

/// Parse a post fragment for the requested id.
///
/// The post block is addressed by either of two conventions (content-key
/// attribute or element-id scheme); no block means not-found. So does a
/// missing author id: a post without an attributable author cannot be
/// modeled. The owning thread key on the document root is required.
pub fn extract_post(doc: &Html, post_id: u64) -> Result<Option<PostParts>> {
    let block_sel = Selector::parse(&format!(
        r#"div.message--post[data-content="post-{post_id}"], article#js-post-{post_id}"#
    ))
    .unwrap();
    let Some(block) = doc.select(&block_sel).next() else {
        return Ok(None);
    };

    // Three author link conventions, in priority order.
    let author = first_match_in(
        &block,
        &[
            ".message-attribution-main a.username",
            ".message-user a.username",
            r#"a[data-xf-init="member-tooltip"]"#,
        ],
    );
    let Some((author_id, author_name)) = author.and_then(|el| {
        attr_u64(&el, "data-user-id").map(|id| (id, text_of(&el)))
    }) else {
        return Ok(None);
    };

    let key = doc.root_element().value().attr("data-content-key");
    let thread_id = match key.and_then(|k| k.strip_prefix("thread-")) {
        Some(raw) => raw.parse::<u64>().map_err(|_| {
            ClientError::Protocol(format!("malformed thread content key for post {post_id}"))
        })?,
        None => {
            return Err(ClientError::Protocol(format!(
                "no thread content key on post {post_id} page"
            )))
        }
    };

    let date_sel = Selector::parse("time.u-dt, .message-attribution-main time").unwrap();
    let date = block
        .select(&date_sel)
        .next()
        .and_then(|el| el.value().attr("datetime"))
        .and_then(parse_datetime);

    let body_sel = Selector::parse(".bbWrapper").unwrap();
    let (content, text_content) = match block.select(&body_sel).next() {
        Some(body) => (body.inner_html(), text_of(&body)),
        None => (String::new(), String::new()),
    };

    Ok(Some(PostParts {
        author_id,
        author_name,
        thread_id,
        date,
        content,
        text_content,
    }))
}

// ── Category ────────────────────────────────────────────────────────────────

/// Parse a category page. No anchor requirement: a record is always
/// produced, with empty strings for whatever is missing.
pub fn extract_category(doc: &Html) -> CategoryParts {
    let title_sel = Selector::parse(".p-title-value").unwrap();
    let desc_sel = Selector::parse(".p-description").unwrap();

    CategoryParts {
        title: doc
            .select(&title_sel)
            .next()
            .map(|el| text_of(&el))
            .unwrap_or_default(),
        description: doc
            .select(&desc_sel)
            .next()
            .map(|el| text_of(&el))
            .unwrap_or_default(),
    }
}

// ── Thread listing ──────────────────────────────────────────────────────────

/// Partition a listing page's thread rows into pinned and regular,
/// preserving source row order. Rows whose title link yields no numeric id
/// appear in neither list. Pinned rows carry the localized pin marker.
pub fn extract_thread_listing(doc: &Html) -> ThreadListing {
    let row_sel = Selector::parse(r#"div[class^="structItem structItem--thread"]"#).unwrap();
    let title_sel = Selector::parse(".structItem-title a").unwrap();
    let pinned_sel = Selector::parse(r#"i[title="Закреплено"]"#).unwrap();
    let id_re = Regex::new(r"/(\d+)/").unwrap();

    let mut listing = ThreadListing::default();
    for row in doc.select(&row_sel) {
        let href = row
            .select(&title_sel)
            .last()
            .and_then(|a| a.value().attr("href"))
            .unwrap_or("");
        let Some(id) = id_re
            .captures(href)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<u64>().ok())
        else {
            continue;
        };

        if row.select(&pinned_sel).next().is_some() {
            listing.pinned.push(id);
        } else {
            listing.regular.push(id);
        }
    }
    listing
}

// ── Current member discovery ────────────────────────────────────────────────

/// The signed-in member's id from the account landing page. The avatar
/// badge is required here: the account page of a live session always
/// carries one.
pub fn extract_current_member_id(doc: &Html) -> Result<u64> {
    let avatar_sel = Selector::parse(".avatar--xxs").unwrap();
    doc.select(&avatar_sel)
        .next()
        .and_then(|el| attr_u64(&el, "data-user-id"))
        .ok_or_else(|| {
            ClientError::Protocol("no member id on account landing page".to_string())
        })
}

// ── Helpers ─────────────────────────────────────────────────────────────────

fn text_of(el: &ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

fn attr_u64(el: &ElementRef<'_>, name: &str) -> Option<u64> {
    el.value().attr(name)?.trim().parse().ok()
}

/// Parse a statistic value, stripping thousands separators. Anything that
/// still fails to parse resolves to 0.
fn parse_count(text: &str) -> u64 {
    text.replace(',', "").trim().parse().unwrap_or(0)
}

/// Parse a machine-readable datetime attribute. The forum emits ISO 8601
/// with a numeric offset, with or without a colon.
fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z"))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// First element matched by any of `selectors`, tried in priority order
/// against the whole document.
fn first_match<'a>(doc: &'a Html, selectors: &[&str]) -> Option<ElementRef<'a>> {
    for raw in selectors {
        let sel = Selector::parse(raw).unwrap();
        if let Some(el) = doc.select(&sel).next() {
            return Some(el);
        }
    }
    None
}

/// First element matched by any of `selectors`, tried in priority order
/// within one element's subtree.
fn first_match_in<'a>(scope: &ElementRef<'a>, selectors: &[&str]) -> Option<ElementRef<'a>> {
    for raw in selectors {
        let sel = Selector::parse(raw).unwrap();
        if let Some(el) = scope.select(&sel).next() {
            return Some(el);
        }
    }
    None
}
