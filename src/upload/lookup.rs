//! Name-to-object resolution for OBJECT_SET fields.
//!
//! A cell like "alice@example.com" or "Data Platform Team" becomes an
//! `ObjectRef` by searching the user and group endpoints and exact-
//! matching the results client-side, case-insensitively. A template's
//! `allowed_otypes` narrows which directory is consulted.

use crate::api::models::ObjectRef;
use crate::api::CatalogClient;

/// Which directory a field's allowed otypes point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectHint {
    User,
    Group,
}

impl ObjectHint {
    /// A single-entry allowed_otypes list pins the directory.
    pub fn from_allowed_otypes(allowed: &[String]) -> Option<Self> {
        if allowed.len() != 1 {
            return None;
        }
        match allowed[0].as_str() {
            "user" => Some(ObjectHint::User),
            "groupprofile" | "group" => Some(ObjectHint::Group),
            _ => None,
        }
    }
}

/// Resolves display names and emails against the catalog directory.
pub struct DirectoryResolver<'a> {
    client: &'a CatalogClient,
}

impl<'a> DirectoryResolver<'a> {
    pub fn new(client: &'a CatalogClient) -> Self {
        Self { client }
    }

    /// Resolve one name to an object reference, or None when nothing
    /// matches exactly.
    pub async fn resolve(&self, name: &str, hint: Option<ObjectHint>) -> Option<ObjectRef> {
        let needle = name.trim();
        if needle.is_empty() {
            return None;
        }

        match hint {
            Some(ObjectHint::User) => self.resolve_user(needle).await,
            Some(ObjectHint::Group) => self.resolve_group(needle).await,
            None => match self.resolve_user(needle).await {
                Some(found) => Some(found),
                None => self.resolve_group(needle).await,
            },
        }
    }

    async fn resolve_user(&self, needle: &str) -> Option<ObjectRef> {
        let lowered = needle.to_lowercase();
        self.client
            .search_users(needle)
            .await
            .into_iter()
            .find(|user| {
                matches_ci(&user.email, &lowered)
                    || matches_ci(&user.display_name, &lowered)
                    || matches_ci(&user.full_name, &lowered)
            })
            .map(|user| ObjectRef { otype: "user".into(), oid: user.id })
    }

    async fn resolve_group(&self, needle: &str) -> Option<ObjectRef> {
        let lowered = needle.to_lowercase();
        self.client
            .search_groups(needle)
            .await
            .into_iter()
            .find(|group| {
                matches_ci(&group.name, &lowered) || matches_ci(&group.display_name, &lowered)
            })
            .map(|group| ObjectRef { otype: "groupprofile".into(), oid: group.id })
    }
}

fn matches_ci(candidate: &Option<String>, lowered_needle: &str) -> bool {
    candidate
        .as_deref()
        .map(|c| c.to_lowercase() == lowered_needle)
        .unwrap_or(false)
}
