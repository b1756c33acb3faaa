//! The seven MetaWeblog operations.
//!
//! [`MetaWeblogService`] is stateless: every call reads and writes
//! through the collaborators and keeps nothing between calls. Each
//! operation receives the [`CallContext`] produced by the credential
//! gate plus its typed request record.

use std::sync::Arc;

use metaweblog_store::{
    Authenticator, ContentStore, MediaStore, PageDefaults, PageQuery, PartStore, ResponseCache,
    SaveOutcome, SiteContext,
};
use metaweblog_types::config::{BridgeConfig, EditFailurePolicy};
use metaweblog_types::{
    Article, Category, ContentPage, MediaUrl, PageId, PagePart, Result, Timestamp, WeblogError,
    PART_BODY, PART_EXTENDED,
};

use crate::args::{
    DeletePostRequest, EditPostRequest, GetPostRequest, GetRecentPostsRequest, NewMediaObjectRequest,
    NewPostRequest,
};
use crate::auth::{CallContext, CredentialGate};
use crate::cache::CacheInvalidator;
use crate::compose::{apply_article, compose_body, ComposedBody};
use crate::mapper::{to_article, to_category};
use crate::parent::{ParentResolver, FOR_CREATE, FOR_EDIT};

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

/// Everything the bridge talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub authenticator: Arc<dyn Authenticator>,
    pub content: Arc<dyn ContentStore>,
    pub parts: Arc<dyn PartStore>,
    pub media: Arc<dyn MediaStore>,
    pub cache: Arc<dyn ResponseCache>,
    pub site: Arc<dyn SiteContext>,
}

// ---------------------------------------------------------------------------
// MetaWeblogService
// ---------------------------------------------------------------------------

/// MetaWeblog operations over the content collaborators.
#[derive(Clone)]
pub struct MetaWeblogService {
    collaborators: Collaborators,
    config: BridgeConfig,
    parents: ParentResolver,
    invalidator: CacheInvalidator,
}

impl MetaWeblogService {
    /// Creates the service.
    ///
    /// # Errors
    ///
    /// [`WeblogError::ConfigError`] if `config` is invalid.
    pub fn new(collaborators: Collaborators, config: BridgeConfig) -> Result<Self> {
        config.validate()?;
        let parents = ParentResolver::new(
            collaborators.content.clone(),
            &config.archive_kind,
            config.default_parent(),
        );
        let invalidator = CacheInvalidator::new(collaborators.cache.clone());
        Ok(Self {
            collaborators,
            config,
            parents,
            invalidator,
        })
    }

    /// Gate checking callers against this service's authenticator.
    pub fn gate(&self) -> CredentialGate {
        CredentialGate::new(self.collaborators.authenticator.clone())
    }

    /// Current public site base.
    pub fn site_base(&self) -> String {
        self.collaborators.site.base_url()
    }

    // -- reads ---------------------------------------------------------------

    /// All archive containers, lowest id first.
    pub async fn list_categories(&self, ctx: &CallContext) -> Result<Vec<Category>> {
        let archives = self
            .collaborators
            .content
            .find_all(&PageQuery::of_kind(&self.config.archive_kind))
            .await?;
        tracing::debug!(count = archives.len(), "categories listed");
        Ok(archives
            .iter()
            .map(|page| to_category(page, ctx.site_base()))
            .collect())
    }

    /// A single post.
    ///
    /// # Errors
    ///
    /// [`WeblogError::NotFound`] for an unknown or unparseable id.
    pub async fn get_post(&self, ctx: &CallContext, req: GetPostRequest) -> Result<Article> {
        let page = self.require(req.postid.page_id()?).await?;
        self.article(ctx, &page).await
    }

    /// The most recently created pages, newest first.
    pub async fn get_recent_posts(
        &self,
        ctx: &CallContext,
        req: GetRecentPostsRequest,
    ) -> Result<Vec<Article>> {
        if req.number_of_posts <= 0 {
            return Ok(Vec::new());
        }
        let limit = usize::try_from(req.number_of_posts)
            .unwrap_or(usize::MAX)
            .min(self.config.max_recent_posts);

        let pages = self
            .collaborators
            .content
            .find_all(&PageQuery::recent(limit))
            .await?;
        let mut articles = Vec::with_capacity(pages.len());
        for page in &pages {
            articles.push(self.article(ctx, page).await?);
        }
        tracing::debug!(requested = req.number_of_posts, returned = articles.len(), "recent posts");
        Ok(articles)
    }

    // -- mutations -----------------------------------------------------------

    /// Creates a post and returns its id.
    ///
    /// # Errors
    ///
    /// [`WeblogError::ValidationFailure`] with every message joined by
    /// `", "` if the store refuses the page.
    pub async fn new_post(&self, ctx: &CallContext, req: NewPostRequest) -> Result<String> {
        let user_id = ctx.identity().user_id;
        let mut page = self
            .collaborators
            .content
            .create(PageDefaults {
                kind: self.config.page_kind.clone(),
                created_by: Some(user_id),
            })
            .await?;

        let parent = self
            .parents
            .resolve(FOR_CREATE, req.article.first_category())
            .await?;
        page.parent_id = parent.as_ref().map(|p| p.id);
        page.updated_by = Some(user_id);
        apply_article(&mut page, &req.article, req.publish);

        // Parts are written only once the page is saved.
        match self.collaborators.content.save(&mut page).await? {
            SaveOutcome::Saved => {
                self.save_parts(page.id, self.compose(&req.article)).await?;
                tracing::info!(
                    post_id = %page.id,
                    parent_id = ?page.parent_id,
                    user = %ctx.identity().username,
                    status = %page.status,
                    "post created"
                );
                self.invalidator.after_create(parent.as_ref()).await;
                Ok(page.id.to_string())
            }
            SaveOutcome::Invalid(errors) => Err(WeblogError::ValidationFailure {
                reason: errors.join(", "),
            }),
        }
    }

    /// Updates a post.
    ///
    /// Without a matching category the current parent is kept. A
    /// refused save follows [`BridgeConfig::edit_failure_policy`]: the
    /// lenient policy stores the new parts regardless, the strict one
    /// leaves them untouched.
    ///
    /// # Errors
    ///
    /// [`WeblogError::NotFound`] for an unknown id;
    /// [`WeblogError::ValidationFailure`] on a refused save under the
    /// strict policy.
    pub async fn edit_post(&self, ctx: &CallContext, req: EditPostRequest) -> Result<bool> {
        let mut page = self.require(req.postid.page_id()?).await?;

        if let Some(parent) = self
            .parents
            .resolve(FOR_EDIT, req.article.first_category())
            .await?
        {
            page.parent_id = Some(parent.id);
        }
        page.updated_by = Some(ctx.identity().user_id);
        apply_article(&mut page, &req.article, req.publish);

        let composed = self.compose(&req.article);
        let outcome = match self.config.edit_failure_policy {
            EditFailurePolicy::Lenient => {
                self.save_parts(page.id, composed).await?;
                self.collaborators.content.save(&mut page).await?
            }
            EditFailurePolicy::Strict => {
                let outcome = self.collaborators.content.save(&mut page).await?;
                if outcome == SaveOutcome::Saved {
                    self.save_parts(page.id, composed).await?;
                }
                outcome
            }
        };
        let parent = self.parent_of(&page).await?;
        self.invalidator.after_edit(&page, parent.as_ref()).await;

        match outcome {
            SaveOutcome::Saved => {
                tracing::info!(
                    post_id = %page.id,
                    user = %ctx.identity().username,
                    status = %page.status,
                    "post updated"
                );
                Ok(true)
            }
            SaveOutcome::Invalid(errors) => match self.config.edit_failure_policy {
                EditFailurePolicy::Lenient => {
                    tracing::warn!(post_id = %page.id, ?errors, "post update refused");
                    Ok(true)
                }
                EditFailurePolicy::Strict => Err(WeblogError::ValidationFailure {
                    reason: errors.join(", "),
                }),
            },
        }
    }

    /// Removes a post together with its parts.
    ///
    /// # Errors
    ///
    /// [`WeblogError::NotFound`] for an unknown id.
    pub async fn delete_post(&self, ctx: &CallContext, req: DeletePostRequest) -> Result<bool> {
        let page = self.require(req.postid.page_id()?).await?;
        let parent = self.parent_of(&page).await?;

        self.collaborators.content.destroy(page.id).await?;
        tracing::info!(post_id = %page.id, user = %ctx.identity().username, "post deleted");

        self.invalidator.after_delete(&page, parent.as_ref()).await;
        Ok(true)
    }

    /// Stores an uploaded file and returns its public URL.
    pub async fn new_media_object(
        &self,
        ctx: &CallContext,
        req: NewMediaObjectRequest,
    ) -> Result<MediaUrl> {
        let data = req.data;
        let resource = self
            .collaborators
            .media
            .persist(&data.name, &data.mime_type, &data.bits, Timestamp::now())
            .await?;
        tracing::info!(
            file = %resource.filename,
            size = resource.size,
            user = %ctx.identity().username,
            "media stored"
        );
        Ok(MediaUrl {
            url: resource.public_url(ctx.site_base()),
        })
    }

    // -- helpers -------------------------------------------------------------

    async fn require(&self, id: PageId) -> Result<ContentPage> {
        self.collaborators
            .content
            .find(id)
            .await?
            .ok_or_else(|| WeblogError::NotFound {
                reason: format!("no post with id '{id}'"),
            })
    }

    async fn parent_of(&self, page: &ContentPage) -> Result<Option<ContentPage>> {
        match page.parent_id {
            Some(id) => self.collaborators.content.find(id).await,
            None => Ok(None),
        }
    }

    async fn article(&self, ctx: &CallContext, page: &ContentPage) -> Result<Article> {
        let parent = self.parent_of(page).await?;
        let body = self.collaborators.parts.part(page.id, PART_BODY).await?;
        Ok(to_article(page, parent.as_ref(), &body, ctx.site_base()))
    }

    fn compose(&self, article: &Article) -> ComposedBody {
        compose_body(
            article.description.as_deref(),
            article.text_more.as_deref(),
            self.config.perex_limit,
        )
    }

    async fn save_parts(&self, page_id: PageId, composed: ComposedBody) -> Result<()> {
        self.collaborators
            .parts
            .save_part(&PagePart {
                page_id,
                name: PART_BODY.into(),
                content: composed.body,
            })
            .await?;
        self.collaborators
            .parts
            .save_part(&PagePart {
                page_id,
                name: PART_EXTENDED.into(),
                content: composed.extended,
            })
            .await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
