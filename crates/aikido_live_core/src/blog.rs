//! crates/aikido_live_core/src/blog.rs
//!
//! Blog posts, comments and appreciation, all stored inside one blog aggregate.
//!
//! Every mutation reads the aggregate, changes the in-memory copy and replaces the
//! whole document. A missing post or a failed write is reported as `false`.

use crate::domain::{BlogDocument, BlogPost, Comment, Role};
use crate::ports::PortResult;
use crate::repository::{DocumentRepository, Versioned};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};

pub struct BlogService {
    repo: Arc<DocumentRepository>,
}

impl BlogService {
    pub fn new(repo: Arc<DocumentRepository>) -> Self {
        Self { repo }
    }

    async fn posts(&self) -> PortResult<Vec<BlogPost>> {
        Ok(self
            .repo
            .get_blog()
            .await?
            .map(|blog| blog.document.blog_posts)
            .unwrap_or_default())
    }

    /// Applies `mutate` to the post with `post_id` and persists the aggregate.
    /// `mutate` returning false aborts without writing.
    async fn mutate_post<F>(&self, post_id: &str, mutate: F) -> PortResult<bool>
    where
        F: FnOnce(&mut BlogPost) -> bool,
    {
        let Some(mut blog) = self.repo.get_blog().await? else {
            return Ok(false);
        };
        let Some(post) = blog.document.post_mut(post_id) else {
            debug!(post_id, "Blog post not found");
            return Ok(false);
        };
        if !mutate(post) {
            return Ok(false);
        }
        self.repo.update_blog_document(&blog).await
    }

    /// Published posts, newest first.
    pub async fn published(&self) -> PortResult<Vec<BlogPost>> {
        let mut posts: Vec<BlogPost> = self
            .posts()
            .await?
            .into_iter()
            .filter(|p| p.is_published)
            .collect();
        newest_first(&mut posts);
        Ok(posts)
    }

    /// Every post by `email` (drafts included), newest first.
    pub async fn by_author(&self, email: &str) -> PortResult<Vec<BlogPost>> {
        let mut posts: Vec<BlogPost> = self
            .posts()
            .await?
            .into_iter()
            .filter(|p| p.is_authored_by(email))
            .collect();
        newest_first(&mut posts);
        Ok(posts)
    }

    pub async fn by_id(&self, post_id: &str) -> PortResult<Option<BlogPost>> {
        Ok(self.posts().await?.into_iter().find(|p| p.id == post_id))
    }

    /// Appends a post, creating the blog aggregate first if none exists yet.
    pub async fn create(&self, post: BlogPost) -> PortResult<bool> {
        let Some(mut blog) = self.repo.get_or_create_blog().await? else {
            return Ok(false);
        };
        let post_id = post.id.clone();
        blog.document.blog_posts.push(post);

        let saved = self.repo.update_blog_document(&blog).await?;
        if saved {
            info!(post_id = %post_id, "Blog post created");
        }
        Ok(saved)
    }

    /// Replaces the stored post that has the same id.
    pub async fn update(&self, post: BlogPost) -> PortResult<bool> {
        let post_id = post.id.clone();
        self.mutate_post(&post_id, move |existing| {
            *existing = post;
            true
        })
        .await
    }

    pub async fn delete(&self, post_id: &str) -> PortResult<bool> {
        let Some(mut blog) = self.repo.get_blog().await? else {
            return Ok(false);
        };
        if !remove_post(&mut blog, post_id) {
            return Ok(false);
        }
        let saved = self.repo.update_blog_document(&blog).await?;
        if saved {
            info!(post_id, "Blog post deleted");
        }
        Ok(saved)
    }

    /// Attaches `comment` to the post, stamping it with the post id.
    pub async fn add_comment(&self, post_id: &str, mut comment: Comment) -> PortResult<bool> {
        comment.blog_post_id = post_id.to_string();
        self.mutate_post(post_id, move |post| {
            post.comments.push(comment);
            true
        })
        .await
    }

    pub async fn delete_comment(&self, post_id: &str, comment_id: &str) -> PortResult<bool> {
        self.mutate_post(post_id, |post| {
            let before = post.comments.len();
            post.comments.retain(|c| c.id != comment_id);
            post.comments.len() != before
        })
        .await
    }

    /// Adds `email` to the post's appreciators, or removes it if already present.
    pub async fn toggle_appreciation(&self, post_id: &str, email: &str) -> PortResult<bool> {
        self.mutate_post(post_id, |post| {
            if !post.appreciated_by.remove(email) {
                post.appreciated_by.insert(email.to_string());
            }
            true
        })
        .await
    }

    /// Counts every view; repeat views are not deduplicated.
    pub async fn increment_view_count(&self, post_id: &str) -> PortResult<bool> {
        self.mutate_post(post_id, |post| {
            post.view_count = post.view_count.saturating_add(1);
            true
        })
        .await
    }
}

fn newest_first(posts: &mut [BlogPost]) {
    posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

fn remove_post(blog: &mut Versioned<BlogDocument>, post_id: &str) -> bool {
    let before = blog.document.blog_posts.len();
    blog.document.blog_posts.retain(|p| p.id != post_id);
    blog.document.blog_posts.len() != before
}

//=========================================================================================
// Authorization Policy
//=========================================================================================

/// Posts may be edited or deleted by their author or an Admin.
pub fn can_manage_post(post: &BlogPost, email: &str, role: Role) -> bool {
    role == Role::Admin || post.is_authored_by(email)
}

/// Comments may be deleted by their author or an Admin.
pub fn can_delete_comment(comment: &Comment, email: &str, role: Role) -> bool {
    role == Role::Admin || comment.is_authored_by(email)
}

/// Marks a post as edited now.
pub fn touch(post: &mut BlogPost) {
    post.updated_at = Utc::now();
}
