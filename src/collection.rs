use std::collections::BTreeMap;

use spdlog::warn;

use crate::graph::sort_feed;
use crate::post::Post;
use crate::validation::Violation;

/// Gathers ingested posts by slug. Every post sharing a slug with another is
/// dropped from the collection and reported; nothing gets renamed.
#[derive(Default)]
pub struct PostCollection {
    claims: BTreeMap<String, Vec<Post>>,
}

impl PostCollection {
    pub fn new() -> PostCollection {
        PostCollection::default()
    }

    pub fn add(&mut self, post: Post) {
        self.claims.entry(post.slug.clone()).or_default().push(post);
    }

    pub fn len(&self) -> usize {
        self.claims.values().map(|posts| posts.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }

    /// Unique posts in feed order, plus one collision per contested slug.
    pub fn resolve(self) -> (Vec<Post>, Vec<Violation>) {
        let mut posts = vec![];
        let mut collisions = vec![];

        for (slug, mut claimants) in self.claims {
            if claimants.len() == 1 {
                posts.append(&mut claimants);
                continue;
            }

            let mut files: Vec<_> = claimants.into_iter().map(|p| p.source).collect();
            files.sort();
            warn!("Slug {} is claimed by {} files, all of them are left out", slug, files.len());
            collisions.push(Violation::SlugCollision { slug, files });
        }

        sort_feed(&mut posts);
        (posts, collisions)
    }
}

impl FromIterator<Post> for PostCollection {
    fn from_iter<T: IntoIterator<Item=Post>>(iter: T) -> Self {
        let mut collection = PostCollection::new();
        for post in iter {
            collection.add(post);
        }
        collection
    }
}
