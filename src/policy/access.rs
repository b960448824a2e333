use std::fmt;

use serde::{Deserialize, Serialize};

use crate::auth::models::Actor;
use crate::error::AppError;
use crate::policy::filter::{Filter, Filterable};

/// The typed document sets managed by the CMS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    /// Blog articles, served as `blogs`.
    #[serde(rename = "blogs")]
    Articles,
    Gallery,
    Sessions,
    Media,
    Users,
    /// The homepage singleton global.
    Homepage,
}

impl Collection {
    /// URL and storage name of the collection.
    pub fn slug(&self) -> &'static str {
        match self {
            Collection::Articles => "blogs",
            Collection::Gallery => "gallery",
            Collection::Sessions => "sessions",
            Collection::Media => "media",
            Collection::Users => "users",
            Collection::Homepage => "homepage",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        match slug {
            "blogs" => Some(Collection::Articles),
            "gallery" => Some(Collection::Gallery),
            "sessions" => Some(Collection::Sessions),
            "media" => Some(Collection::Media),
            "users" => Some(Collection::Users),
            "homepage" => Some(Collection::Homepage),
            _ => None,
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Read,
    Create,
    Update,
    Delete,
}

/// Outcome of an access decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    /// Every document is in reach.
    Allow,
    /// The operation is refused outright.
    Deny,
    /// Only documents matching the filter are in reach.
    RestrictedTo(Filter),
}

impl Access {
    /// Whether the operation may touch this particular document.
    pub fn permits<T: Filterable + ?Sized>(&self, doc: &T) -> bool {
        match self {
            Access::Allow => true,
            Access::Deny => false,
            Access::RestrictedTo(filter) => filter.matches(doc),
        }
    }

    pub fn is_denied(&self) -> bool {
        matches!(self, Access::Deny)
    }

    /// Turn the decision into a store scope: `None` for unrestricted access,
    /// the filter for restricted access, a `Forbidden` error for a denial.
    pub fn into_scope(self) -> Result<Option<Filter>, AppError> {
        match self {
            Access::Allow => Ok(None),
            Access::Deny => Err(AppError::forbidden()),
            Access::RestrictedTo(filter) => Ok(Some(filter)),
        }
    }
}

/// Who is asking, as far as the policy is concerned.
enum Standing<'a> {
    Anonymous,
    Member(&'a Actor),
    Admin,
}

impl<'a> Standing<'a> {
    fn of(actor: Option<&'a Actor>) -> Self {
        match actor {
            None => Standing::Anonymous,
            Some(actor) if actor.is_admin() => Standing::Admin,
            Some(actor) => Standing::Member(actor),
        }
    }

    fn authenticated(&self) -> Access {
        match self {
            Standing::Anonymous => Access::Deny,
            Standing::Member(_) | Standing::Admin => Access::Allow,
        }
    }

    fn admin_only(&self) -> Access {
        match self {
            Standing::Admin => Access::Allow,
            Standing::Anonymous | Standing::Member(_) => Access::Deny,
        }
    }
}

/// Decide whether `actor` may perform `operation` on `collection`.
pub fn can_perform(actor: Option<&Actor>, collection: Collection, operation: Operation) -> Access {
    use Collection::*;
    use Operation::*;

    let standing = Standing::of(actor);

    match (collection, operation) {
        (Articles, Read) => match standing {
            Standing::Anonymous => Access::RestrictedTo(Filter::published()),
            Standing::Member(actor) => Access::RestrictedTo(Filter::Any(vec![
                Filter::published(),
                Filter::authored_by(actor.id.as_str()),
            ])),
            Standing::Admin => Access::Allow,
        },
        (Articles, Create) => standing.authenticated(),
        (Articles, Update | Delete) => match standing {
            Standing::Anonymous => Access::Deny,
            Standing::Member(actor) => {
                Access::RestrictedTo(Filter::authored_by(actor.id.as_str()))
            }
            Standing::Admin => Access::Allow,
        },

        (Gallery | Sessions | Media, Read) => Access::Allow,
        (Gallery | Sessions | Media, Create | Update) => standing.authenticated(),
        (Gallery | Sessions | Media, Delete) => standing.admin_only(),

        (Homepage, Read) => Access::Allow,
        (Homepage, Update) => standing.authenticated(),
        (Homepage, Create | Delete) => Access::Deny,

        (Users, Read | Create | Update | Delete) => standing.authenticated(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::models::Role;
    use crate::models::publication::PublicationState;

    struct Article {
        state: PublicationState,
        author: &'static str,
    }

    impl Filterable for Article {
        fn publication_state(&self) -> Option<PublicationState> {
            Some(self.state)
        }

        fn author_id(&self) -> Option<&str> {
            Some(self.author)
        }
    }

    struct GalleryItem;

    impl Filterable for GalleryItem {}

    fn actor(id: &str, roles: &[Role]) -> Actor {
        Actor {
            id: id.to_string(),
            email: format!("{id}@example.com"),
            roles: roles.to_vec(),
        }
    }

    const ALL_OPS: [Operation; 4] = [
        Operation::Read,
        Operation::Create,
        Operation::Update,
        Operation::Delete,
    ];

    #[test]
    fn test_anonymous_article_read_is_published_only() {
        assert_eq!(
            can_perform(None, Collection::Articles, Operation::Read),
            Access::RestrictedTo(Filter::StatusEquals(PublicationState::Published))
        );
    }

    #[test]
    fn test_admin_article_read_is_unrestricted() {
        let admin = actor("root", &[Role::Admin]);
        assert_eq!(
            can_perform(Some(&admin), Collection::Articles, Operation::Read),
            Access::Allow
        );
    }

    #[test]
    fn test_anonymous_read_filters_candidates() {
        let access = can_perform(None, Collection::Articles, Operation::Read);
        let candidates = [
            Article {
                state: PublicationState::Draft,
                author: "x",
            },
            Article {
                state: PublicationState::Published,
                author: "x",
            },
        ];
        let visible: Vec<_> = candidates.iter().filter(|a| access.permits(*a)).collect();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].state, PublicationState::Published);
    }

    #[test]
    fn test_member_never_reads_foreign_drafts() {
        for roles in [&[][..], &[Role::Editor][..]] {
            let member = actor("alice", roles);
            let access = can_perform(Some(&member), Collection::Articles, Operation::Read);
            for author in ["bob", "carol", "root"] {
                let draft = Article {
                    state: PublicationState::Draft,
                    author,
                };
                assert!(!access.permits(&draft), "{author}'s draft leaked");
            }
            assert!(access.permits(&Article {
                state: PublicationState::Draft,
                author: "alice",
            }));
            assert!(access.permits(&Article {
                state: PublicationState::Published,
                author: "bob",
            }));
        }
    }

    #[test]
    fn test_article_create_requires_actor() {
        let member = actor("alice", &[Role::Editor]);
        assert!(can_perform(None, Collection::Articles, Operation::Create).is_denied());
        assert_eq!(
            can_perform(Some(&member), Collection::Articles, Operation::Create),
            Access::Allow
        );
    }

    #[test]
    fn test_article_mutation_is_owner_scoped() {
        let member = actor("alice", &[Role::Editor]);
        let admin = actor("root", &[Role::Admin]);
        for op in [Operation::Update, Operation::Delete] {
            assert!(can_perform(None, Collection::Articles, op).is_denied());
            assert_eq!(
                can_perform(Some(&member), Collection::Articles, op),
                Access::RestrictedTo(Filter::authored_by("alice"))
            );
            assert_eq!(can_perform(Some(&admin), Collection::Articles, op), Access::Allow);

            let access = can_perform(Some(&member), Collection::Articles, op);
            assert!(!access.permits(&Article {
                state: PublicationState::Published,
                author: "bob",
            }));
        }
    }

    #[test]
    fn test_gallery_delete_is_admin_only() {
        let member = actor("alice", &[Role::Editor]);
        let admin = actor("root", &[Role::Admin]);
        for collection in [Collection::Gallery, Collection::Sessions, Collection::Media] {
            assert!(can_perform(Some(&member), collection, Operation::Delete).is_denied());
            assert!(can_perform(None, collection, Operation::Delete).is_denied());
            let access = can_perform(Some(&admin), collection, Operation::Delete);
            assert_eq!(access, Access::Allow);
            assert!(access.permits(&GalleryItem));
        }
    }

    #[test]
    fn test_gallery_read_and_write() {
        let member = actor("alice", &[]);
        for collection in [Collection::Gallery, Collection::Sessions] {
            assert_eq!(can_perform(None, collection, Operation::Read), Access::Allow);
            for op in [Operation::Create, Operation::Update] {
                assert!(can_perform(None, collection, op).is_denied());
                assert_eq!(can_perform(Some(&member), collection, op), Access::Allow);
            }
        }
    }

    #[test]
    fn test_homepage_rules() {
        let member = actor("alice", &[Role::Editor]);
        let admin = actor("root", &[Role::Admin]);
        assert_eq!(can_perform(None, Collection::Homepage, Operation::Read), Access::Allow);
        assert!(can_perform(None, Collection::Homepage, Operation::Update).is_denied());
        assert_eq!(
            can_perform(Some(&member), Collection::Homepage, Operation::Update),
            Access::Allow
        );
        for op in [Operation::Create, Operation::Delete] {
            assert!(can_perform(Some(&admin), Collection::Homepage, op).is_denied());
        }
    }

    #[test]
    fn test_users_require_actor() {
        let member = actor("alice", &[]);
        for op in ALL_OPS {
            assert!(can_perform(None, Collection::Users, op).is_denied());
            assert_eq!(can_perform(Some(&member), Collection::Users, op), Access::Allow);
        }
    }

    #[test]
    fn test_into_scope() {
        assert_eq!(Access::Allow.into_scope().unwrap(), None);
        assert_eq!(
            Access::RestrictedTo(Filter::published()).into_scope().unwrap(),
            Some(Filter::published())
        );
        assert!(matches!(
            Access::Deny.into_scope(),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn test_collection_slugs() {
        for collection in [
            Collection::Articles,
            Collection::Gallery,
            Collection::Sessions,
            Collection::Media,
            Collection::Users,
            Collection::Homepage,
        ] {
            assert_eq!(Collection::from_slug(collection.slug()), Some(collection));
        }
        assert_eq!(Collection::from_slug("posts"), None);
        assert_eq!(Collection::Articles.to_string(), "blogs");
    }
}
