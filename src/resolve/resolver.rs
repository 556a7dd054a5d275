use std::collections::{BTreeMap, BTreeSet};

use crate::{
    foundation::core::PartKey,
    foundation::error::{ScenecropError, ScenecropResult},
    resolve::reference::{GROUP_SEPARATOR, ObjectRef},
    segment::decode::SegmentMap,
};

/// Resolved set of part keys that together form one semantic object.
pub type PartKeySet = BTreeSet<PartKey>;

/// Static articulation topology of the loaded scene.
pub trait Articulation {
    /// Link ids (in segmentation link space) moved by `joint` of `body`.
    fn links_actuated_by(&self, body: i32, joint: i32) -> Vec<i32>;
}

/// Articulation table held in memory, keyed by `(body, joint)`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StaticArticulation {
    joints: BTreeMap<(i32, i32), Vec<i32>>,
}

impl StaticArticulation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, body: i32, joint: i32, links: Vec<i32>) {
        self.joints.insert((body, joint), links);
    }

    /// Build from a record keyed by `"(body, joint)"` strings.
    pub fn from_keyed(record: &BTreeMap<String, Vec<i32>>) -> ScenecropResult<Self> {
        let mut out = Self::new();
        for (key, links) in record {
            match ObjectRef::parse(key)? {
                ObjectRef::Joint(b, j) => out.insert(b, j, links.clone()),
                other => {
                    return Err(ScenecropError::reference(format!(
                        "articulation key must be (body, joint), got '{other}'"
                    )));
                }
            }
        }
        Ok(out)
    }
}

impl Articulation for StaticArticulation {
    fn links_actuated_by(&self, body: i32, joint: i32) -> Vec<i32> {
        self.joints.get(&(body, joint)).cloned().unwrap_or_default()
    }
}

/// Resolve `reference` to the part keys it covers.
///
/// Only whole-body references consult `map`: they take every decoded key of the
/// body and fall back to the base link so an unseen body is still representable.
pub fn resolve(
    reference: &ObjectRef,
    map: &SegmentMap,
    articulation: &dyn Articulation,
) -> PartKeySet {
    match reference {
        ObjectRef::Single(b) => {
            let mut keys: PartKeySet = map.keys().filter(|k| k.body == *b).copied().collect();
            if keys.is_empty() {
                keys.insert(PartKey::base(*b));
            }
            keys
        }
        ObjectRef::Link(b, _joint, l) => PartKeySet::from([PartKey::new(*b, *l)]),
        ObjectRef::Joint(b, j) => articulation
            .links_actuated_by(*b, *j)
            .into_iter()
            .map(|l| PartKey::new(*b, l))
            .collect(),
        ObjectRef::Pair(a, c) => {
            let mut keys = resolve(a, map, articulation);
            keys.extend(resolve(c, map, articulation));
            keys
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
/// One entry of the object index.
pub struct IndexedObject {
    /// Raw index key as stored in the scene record.
    pub key: String,
    pub reference: ObjectRef,
    /// Display name used in artifact file names.
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
/// Several indexed objects rendered together as one artifact.
pub struct ObjectGroup {
    /// Member index keys joined with `+`.
    pub key: String,
    /// Member names joined with `+`.
    pub name: String,
    /// Member index keys in order.
    pub members: Vec<String>,
}

/// Semantic object index for one scene, decoded from its `body_to_name` record.
#[derive(Debug, Default)]
pub struct ObjectIndex {
    objects: Vec<IndexedObject>,
    rejected: Vec<(String, ScenecropError)>,
}

impl ObjectIndex {
    /// Decode every entry; malformed keys are kept aside instead of failing the
    /// whole index.
    pub fn from_names(body_to_name: &BTreeMap<String, String>) -> Self {
        let mut out = Self::default();
        for (key, name) in body_to_name {
            match ObjectRef::parse(key) {
                Ok(reference) if !reference.is_group() => out.objects.push(IndexedObject {
                    key: key.clone(),
                    reference,
                    name: name.clone(),
                }),
                Ok(_) => out.rejected.push((
                    key.clone(),
                    ScenecropError::reference(format!(
                        "group key '{key}' cannot name a single object"
                    )),
                )),
                Err(e) => out.rejected.push((key.clone(), e)),
            }
        }
        out
    }

    pub fn objects(&self) -> &[IndexedObject] {
        &self.objects
    }

    /// Entries whose keys failed to decode.
    pub fn rejected(&self) -> &[(String, ScenecropError)] {
        &self.rejected
    }

    /// Number of index entries, including rejected ones.
    pub fn len(&self) -> usize {
        self.objects.len() + self.rejected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Object groups mentioned by initial-state facts.
    ///
    /// A fact contributes a group when two or more of its arguments are indexed
    /// object names; duplicate groups are kept once.
    pub fn find_groups(&self, facts: &[Vec<String>]) -> Vec<ObjectGroup> {
        let mut by_name = BTreeMap::<&str, &str>::new();
        for obj in &self.objects {
            by_name.insert(obj.name.as_str(), obj.key.as_str());
        }

        let mut out = Vec::<ObjectGroup>::new();
        for fact in facts {
            let names: Vec<&str> = fact
                .iter()
                .map(String::as_str)
                .filter(|n| by_name.contains_key(n))
                .collect();
            if names.len() < 2 {
                continue;
            }
            let members: Vec<String> = names.iter().map(|n| by_name[n].to_string()).collect();
            let sep = GROUP_SEPARATOR.to_string();
            let group = ObjectGroup {
                key: members.join(&sep),
                name: names.join(&sep),
                members,
            };
            if !out.contains(&group) {
                out.push(group);
            }
        }
        out
    }

    /// Resolve every indexed object against one decoded buffer, keyed by index key.
    pub fn resolve_all(
        &self,
        map: &SegmentMap,
        articulation: &dyn Articulation,
    ) -> BTreeMap<String, PartKeySet> {
        self.objects
            .iter()
            .map(|o| (o.key.clone(), resolve(&o.reference, map, articulation)))
            .collect()
    }
}

/// Union of the already-resolved member sets of `group`.
pub fn resolve_group(
    group: &ObjectGroup,
    resolved: &BTreeMap<String, PartKeySet>,
) -> ScenecropResult<PartKeySet> {
    let mut keys = PartKeySet::new();
    for member in &group.members {
        let set = resolved.get(member).ok_or_else(|| {
            ScenecropError::reference(format!(
                "group '{}' names unindexed member '{member}'",
                group.name
            ))
        })?;
        keys.extend(set.iter().copied());
    }
    Ok(keys)
}

#[cfg(test)]
#[path = "../../tests/unit/resolve/resolver.rs"]
mod tests;
