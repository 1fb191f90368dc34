use tracing::{info, warn};

use agora_api::ForumBackend;
use agora_types::api::{CreateForumRequest, ForumFilter, MembershipFilter};
use agora_types::models::{Category, Forum, ForumId, Membership, Page, Tag, UserId};

use crate::error::{DiscussionError, Rejection, Result};
use crate::notifier::Notifier;

/// One page of the forum list.
#[derive(Debug, Clone, PartialEq)]
pub struct ForumListing {
    pub forums: Vec<Forum>,
    pub page: u32,
    pub total_pages: u32,
    pub count: Option<u64>,
}

#[derive(Debug, Clone, Default)]
pub struct NewForum {
    pub name: String,
    pub description: String,
    pub category: Option<i64>,
    pub tags: Vec<i64>,
}

/// Forum list, creation and membership.
pub struct ForumDirectory<B> {
    backend: B,
    page_size: u32,
    notifier: Notifier,
}

impl<B: ForumBackend> ForumDirectory<B> {
    pub fn new(backend: B, page_size: u32, notifier: Notifier) -> Self {
        Self {
            backend,
            page_size: page_size.max(1),
            notifier,
        }
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// List forums. Page and page size default to the first page and the
    /// configured size.
    pub async fn list(&self, mut filter: ForumFilter) -> Result<ForumListing> {
        let page_size = *filter.page_size.get_or_insert(self.page_size);
        let page = *filter.page.get_or_insert(1);

        let listing = self
            .backend
            .list_forums(&filter)
            .await
            .map_err(|e| self.fail(DiscussionError::Load(e)))?
            .map(Forum::from);

        Ok(ForumListing {
            page,
            total_pages: listing.total_pages(page_size),
            count: listing.count,
            forums: listing.results,
        })
    }

    pub async fn get(&self, id: ForumId) -> Result<Forum> {
        self.backend
            .get_forum(id)
            .await
            .map(Forum::from)
            .map_err(|e| self.fail(DiscussionError::Load(e)))
    }

    pub async fn create(&self, new: NewForum) -> Result<Forum> {
        let name = new.name.trim();
        if name.is_empty() {
            return Err(Rejection::EmptyText.into());
        }
        let req = CreateForumRequest {
            name: name.to_string(),
            description: new.description.trim().to_string(),
            category: new.category,
            tags: new.tags,
            is_locked: false,
        };

        let forum = self
            .backend
            .create_forum(&req)
            .await
            .map(Forum::from)
            .map_err(|e| self.fail(DiscussionError::Forum(e)))?;
        info!("Created forum {} ({})", forum.name, forum.id);
        Ok(forum)
    }

    /// The server soft-deletes; the forum just stops being listed.
    pub async fn delete(&self, id: ForumId) -> Result<()> {
        self.backend
            .delete_forum(id)
            .await
            .map_err(|e| self.fail(DiscussionError::Forum(e)))?;
        info!("Deleted forum {}", id);
        Ok(())
    }

    pub async fn categories(&self) -> Result<Vec<Category>> {
        self.backend
            .list_categories()
            .await
            .map_err(|e| self.fail(DiscussionError::Load(e)))
    }

    pub async fn tags(&self) -> Result<Vec<Tag>> {
        self.backend
            .list_tags()
            .await
            .map_err(|e| self.fail(DiscussionError::Load(e)))
    }

    pub async fn memberships(&self, user_id: UserId) -> Result<Vec<Membership>> {
        let filter = MembershipFilter {
            user_id: Some(user_id),
            forum_id: None,
        };
        self.membership_page(&filter)
            .await
            .map(|page| page.results)
    }

    pub async fn join(&self, forum_id: ForumId) -> Result<Membership> {
        let membership = self
            .backend
            .join_forum(forum_id)
            .await
            .map(Membership::from)
            .map_err(|e| self.fail(DiscussionError::Membership(e)))?;
        info!("Joined forum {}", forum_id);
        Ok(membership)
    }

    /// Leaving deletes the membership record, so look it up first.
    pub async fn leave(&self, forum_id: ForumId, user_id: UserId) -> Result<()> {
        let filter = MembershipFilter {
            user_id: Some(user_id),
            forum_id: Some(forum_id),
        };
        let page = self.membership_page(&filter).await?;
        let membership = page
            .results
            .into_iter()
            .find(|m| m.forum == forum_id && m.user == user_id)
            .ok_or(Rejection::NotMember)?;

        self.backend
            .leave_forum(membership.id)
            .await
            .map_err(|e| self.fail(DiscussionError::Membership(e)))?;
        info!("Left forum {}", forum_id);
        Ok(())
    }

    async fn membership_page(&self, filter: &MembershipFilter) -> Result<Page<Membership>> {
        self.backend
            .list_memberships(filter)
            .await
            .map(|page| page.map(Membership::from))
            .map_err(|e| self.fail(DiscussionError::Membership(e)))
    }

    fn fail(&self, err: DiscussionError) -> DiscussionError {
        if let Some(kind) = err.kind() {
            warn!("{}", err);
            self.notifier.alert(kind, err.to_string());
        }
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeBackend;
    use agora_types::events::{AlertKind, DiscussionEvent};

    fn directory(backend: &FakeBackend) -> ForumDirectory<FakeBackend> {
        ForumDirectory::new(backend.clone(), 2, Notifier::new())
    }

    #[tokio::test]
    async fn total_pages_from_count_or_length() {
        let backend = FakeBackend::new()
            .with_forum(1, 1, false)
            .with_forum(2, 1, false)
            .with_forum(3, 2, true);

        let bare = directory(&backend).list(ForumFilter::default()).await.unwrap();
        assert_eq!(bare.forums.len(), 3);
        assert_eq!(bare.count, None);
        assert_eq!(bare.total_pages, 2);
        assert_eq!(bare.page, 1);

        let backend = backend.paginated();
        let enveloped = directory(&backend).list(ForumFilter::default()).await.unwrap();
        assert_eq!(enveloped.count, Some(3));
        assert_eq!(enveloped.total_pages, 2);
    }

    #[tokio::test]
    async fn empty_listing_has_one_page() {
        let backend = FakeBackend::new();
        let listing = directory(&backend).list(ForumFilter::default()).await.unwrap();
        assert!(listing.forums.is_empty());
        assert_eq!(listing.total_pages, 1);
    }

    #[tokio::test]
    async fn filters_are_passed_through() {
        let backend = FakeBackend::new()
            .with_forum(1, 1, false)
            .with_forum(2, 2, true);
        let filter = ForumFilter {
            is_locked: Some(true),
            ..Default::default()
        };

        let listing = directory(&backend).list(filter).await.unwrap();
        assert_eq!(listing.forums.len(), 1);
        assert_eq!(listing.forums[0].id, 2);
        assert!(listing.forums[0].locked);
    }

    #[tokio::test]
    async fn create_trims_and_requires_a_name() {
        let backend = FakeBackend::new().acting_as(7);
        let directory = directory(&backend);

        let err = directory.create(NewForum::default()).await.unwrap_err();
        assert_eq!(err.rejection(), Some(&Rejection::EmptyText));
        assert_eq!(backend.calls("create_forum"), 0);

        let forum = directory
            .create(NewForum {
                name: "  Rust  ".into(),
                description: "systems talk".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(forum.name, "Rust");
        assert_eq!(forum.created_by, Some(7));
        assert!(!forum.locked);

        directory.delete(forum.id).await.unwrap();
        let err = directory.get(forum.id).await.unwrap_err();
        assert!(matches!(err, DiscussionError::Load(_)));
    }

    #[tokio::test]
    async fn join_and_leave() {
        let backend = FakeBackend::new()
            .acting_as(3)
            .with_forum(1, 1, false)
            .with_membership(50, 3, 9);
        let directory = directory(&backend);

        let membership = directory.join(1).await.unwrap();
        assert_eq!(membership.forum, 1);
        assert_eq!(directory.memberships(3).await.unwrap().len(), 2);

        directory.leave(1, 3).await.unwrap();
        let remaining = directory.memberships(3).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].forum, 9);

        let err = directory.leave(1, 3).await.unwrap_err();
        assert_eq!(err.rejection(), Some(&Rejection::NotMember));
        assert_eq!(backend.calls("leave_forum"), 1);
    }

    #[tokio::test]
    async fn failures_raise_alerts() {
        let backend = FakeBackend::new();
        let notifier = Notifier::new();
        let mut rx = notifier.subscribe();
        let directory = ForumDirectory::new(backend.clone(), 10, notifier);
        backend.fail("join_forum");

        let err = directory.join(1).await.unwrap_err();
        assert!(matches!(err, DiscussionError::Membership(_)));
        assert!(matches!(
            rx.try_recv().unwrap(),
            DiscussionEvent::Alert {
                kind: AlertKind::Membership,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn catalog_lookups() {
        let backend = FakeBackend::new().with_catalog(
            vec![Category { id: 1, name: "General".into() }],
            vec![Tag { id: 4, name: "help".into() }, Tag { id: 5, name: "meta".into() }],
        );
        let directory = directory(&backend);

        assert_eq!(directory.categories().await.unwrap()[0].name, "General");
        assert_eq!(directory.tags().await.unwrap().len(), 2);
    }
}
