use tracing::debug;

use super::Graph;
use crate::models::{NodeId, Tag, TagId, Timestamp};
use crate::{Error, Result};

impl Graph {
    /// Create a new tag
    pub fn create_tag(&mut self, name: &str, hue: f64, now: Timestamp) -> Result<TagId> {
        if !Tag::is_valid_name(name) {
            return Err(Error::InvalidInput(format!("invalid tag name: {name:?}")));
        }
        if self.tag_by_name(name).is_some() {
            return Err(Error::InvalidInput(format!(
                "a tag named {} already exists",
                Tag::normalize_name(name)
            )));
        }
        let tag = Tag::new(name, hue, now);
        let id = tag.id.clone();
        self.tags_mut().insert(id.clone(), tag);
        Ok(id)
    }

    /// Get a tag by name, ignoring case
    pub fn tag_by_name(&self, name: &str) -> Option<&Tag> {
        let wanted = Tag::normalize_name(name).to_lowercase();
        self.tags().find(|tag| tag.name.to_lowercase() == wanted)
    }

    /// Get or create a tag by name
    pub fn get_or_create_tag(&mut self, name: &str, hue: f64, now: Timestamp) -> Result<TagId> {
        match self.tag_by_name(name) {
            Some(tag) => Ok(tag.id.clone()),
            None => self.create_tag(name, hue, now),
        }
    }

    pub fn rename_tag(&mut self, id: &TagId, name: &str, now: Timestamp) -> Result<()> {
        if !Tag::is_valid_name(name) {
            return Err(Error::InvalidInput(format!("invalid tag name: {name:?}")));
        }
        if self.tag_by_name(name).is_some_and(|other| &other.id != id) {
            return Err(Error::InvalidInput(format!(
                "a tag named {} already exists",
                Tag::normalize_name(name)
            )));
        }
        self.tags_mut()
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?
            .rename(name, now);
        Ok(())
    }

    pub fn set_tag_hue(&mut self, id: &TagId, hue: f64, now: Timestamp) -> Result<()> {
        let tag = self
            .tags_mut()
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        tag.hue = Tag::normalize_hue(hue);
        tag.history.last_modified_time = tag.history.last_modified_time.max(now);
        Ok(())
    }

    /// Delete a tag and remove it from every node carrying it.
    pub fn delete_tag(&mut self, id: &TagId, now: Timestamp) -> Result<Tag> {
        let tag = self
            .tags_mut()
            .remove(id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        let tagged = self.nodes_with_tag(id);
        for node_id in &tagged {
            let node = self.node_mut(node_id)?;
            node.tags.retain(|tag_id| tag_id != id);
            node.history.touch(now);
        }
        debug!(tag = %id, untagged = tagged.len(), "deleted tag");
        Ok(tag)
    }

    /// Add a tag to a node. Returns `false` if it was already there.
    pub fn tag_node(&mut self, node_id: &NodeId, tag_id: &TagId, now: Timestamp) -> Result<bool> {
        self.tag(tag_id)?;
        let node = self.node_mut(node_id)?;
        if node.tags.contains(tag_id) {
            return Ok(false);
        }
        node.tags.push(tag_id.clone());
        node.history.touch(now);
        Ok(true)
    }

    /// Remove a tag from a node. Returns `false` if it wasn't there.
    pub fn untag_node(&mut self, node_id: &NodeId, tag_id: &TagId, now: Timestamp) -> Result<bool> {
        let node = self.node_mut(node_id)?;
        let before = node.tags.len();
        node.tags.retain(|id| id != tag_id);
        if node.tags.len() == before {
            return Ok(false);
        }
        node.history.touch(now);
        Ok(true)
    }

    /// Every text node carrying the tag, in id order.
    pub fn nodes_with_tag(&self, tag_id: &TagId) -> Vec<NodeId> {
        self.docs()
            .filter_map(|doc| doc.as_node())
            .filter(|node| node.tags.contains(tag_id))
            .map(|node| node.id.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    #[test]
    fn test_create_and_lookup() {
        let mut g = graph(&[("root", None, &[])]);
        let id = g.create_tag("#Work", 30.0, 5).unwrap();
        assert_eq!(g.tag(&id).unwrap().name, "Work");
        assert_eq!(g.tag_by_name("work").unwrap().id, id);
        assert!(matches!(g.create_tag("work", 0.0, 5), Err(Error::InvalidInput(_))));
        assert!(matches!(g.create_tag("  ", 0.0, 5), Err(Error::InvalidInput(_))));
        assert_eq!(g.get_or_create_tag("WORK", 0.0, 5).unwrap(), id);
    }

    #[test]
    fn test_tag_and_untag() {
        let mut g = graph(&[("root", None, &["a"]), ("a", Some("root"), &[])]);
        let id = g.create_tag("work", 0.0, 5).unwrap();
        assert!(g.tag_node(&nid("a"), &id, 2_000).unwrap());
        assert!(!g.tag_node(&nid("a"), &id, 2_000).unwrap());
        assert_eq!(g.nodes_with_tag(&id), vec![nid("a")]);
        assert_eq!(g.node(&nid("a")).unwrap().history.last_modified_time, 2_000);
        assert!(g.untag_node(&nid("a"), &id, 3_000).unwrap());
        assert!(!g.untag_node(&nid("a"), &id, 3_000).unwrap());
        assert!(g.tag_node(&nid("a"), &TagId::new("nope"), 1).is_err());
    }

    #[test]
    fn test_delete_tag_strips_nodes() {
        let mut g = graph(&[("root", None, &["a"]), ("a", Some("root"), &[])]);
        let id = g.create_tag("work", 0.0, 5).unwrap();
        g.tag_node(&nid("a"), &id, 5).unwrap();
        let removed = g.delete_tag(&id, 9_000).unwrap();
        assert_eq!(removed.name, "work");
        assert!(g.node(&nid("a")).unwrap().tags.is_empty());
        assert!(g.tag(&id).is_err());
    }

    #[test]
    fn test_rename_conflict() {
        let mut g = graph(&[("root", None, &[])]);
        let work = g.create_tag("work", 0.0, 5).unwrap();
        g.create_tag("home", 0.0, 5).unwrap();
        assert!(g.rename_tag(&work, "Home", 6).is_err());
        g.rename_tag(&work, "Work", 6).unwrap();
        assert_eq!(g.tag(&work).unwrap().name, "Work");
        g.set_tag_hue(&work, -30.0, 7).unwrap();
        assert_eq!(g.tag(&work).unwrap().hue, 330.0);
    }
}
