//! Aggregation of same-named street segments into logical streets.
//!
//! Segments sharing a name are grouped by proximity, the groups are merged
//! until no two share a member, and optionally groups whose loose ends line
//! up are joined as well. Each remaining group becomes a [`Street`].

use std::collections::{BTreeMap, BTreeSet};

use geo::{BoundingRect, Coord, Distance, Euclidean, Intersects, LineString, Rect};
use hashbrown::HashMap;
use log::{debug, info};

use super::config::StreetConfig;
use super::tile::TileBuilder;
use crate::BuildError;
use crate::algo::same_street;
use crate::model::{Endpoint, Feature, FeatureBase, FeatureId, Name, Street};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregateReport {
    pub streets: usize,
    /// Extra streets created because a name was used by disjoint groups
    pub split: usize,
    pub merged_on_line: usize,
    pub duplicates_merged: usize,
}

#[derive(Debug, Clone)]
struct NamedSegment {
    id: FeatureId,
    line: LineString<f64>,
    rect: Option<Rect<f64>>,
    road_class: u8,
    span: u32,
    name: Name,
}

type Group = BTreeSet<usize>;

impl TileBuilder {
    /// Replaces all streets of the tile with ones built from the current
    /// street segments.
    ///
    /// # Errors
    ///
    /// Fails if a street cannot be stored.
    pub fn aggregate_streets(&mut self) -> Result<AggregateReport, BuildError> {
        let old: Vec<FeatureId> = self.streets().map(|(id, _)| id).collect();
        for id in old {
            self.store.remove(id)?;
        }

        let config = self.config.streets.clone();
        let units = self.config.units_per_meter;
        let mut report = AggregateReport::default();
        let mut built: Vec<(Vec<FeatureId>, Vec<Name>)> = Vec::new();

        for (text, segments) in self.segments_by_name() {
            let mut groups = group_segments(&segments, &config, units);
            merge_intersecting(&mut groups);
            if config.merge_on_line {
                report.merged_on_line += merge_on_line(&mut groups, &segments, &config, units);
            }
            if groups.len() > 1 {
                debug!("Street {text:?} split into {} parts", groups.len());
                report.split += groups.len() - 1;
            }
            for group in groups {
                let mut members: Vec<&NamedSegment> = group.iter().map(|&i| &segments[i]).collect();
                members.sort_by_key(|s| (s.span, s.id));
                let name = members[0].name.clone();
                built.push((members.iter().map(|s| s.id).collect(), vec![name]));
            }
        }

        let mut unique: Vec<(Vec<FeatureId>, Vec<Name>)> = Vec::with_capacity(built.len());
        let mut by_members: HashMap<BTreeSet<FeatureId>, usize> = HashMap::new();
        for (members, names) in built {
            let key: BTreeSet<FeatureId> = members.iter().copied().collect();
            if let Some(&pos) = by_members.get(&key) {
                let existing = &mut unique[pos].1;
                for name in names {
                    if !existing.contains(&name) {
                        existing.push(name);
                    }
                }
                report.duplicates_merged += 1;
            } else {
                by_members.insert(key, unique.len());
                unique.push((members, names));
            }
        }

        for (segments, names) in unique {
            let zoom = segments[0].zoom();
            let mut base = FeatureBase::new(Vec::new());
            base.names = names;
            self.add_feature_at(zoom, Feature::Street(Street { base, segments }))?;
            report.streets += 1;
        }

        self.stats.streets = report.streets;
        self.stats.streets_split = report.split;
        self.stats.streets_merged_on_line = report.merged_on_line;
        self.stats.duplicate_streets = report.duplicates_merged;
        info!(
            "Aggregated {} streets ({} split, {} merged on line)",
            report.streets, report.split, report.merged_on_line
        );
        Ok(report)
    }

    /// Real street segments per name text, in name order.
    fn segments_by_name(&self) -> BTreeMap<String, Vec<NamedSegment>> {
        let mut by_name: BTreeMap<String, Vec<NamedSegment>> = BTreeMap::new();
        for (id, feature) in self.store.iter() {
            let Some(segment) = feature.as_street_segment() else {
                continue;
            };
            if self.boundary.is_virtual(id) {
                continue;
            }
            let Some(line) = segment.base.geometry.first() else {
                continue;
            };
            let mut seen = BTreeSet::new();
            for name in &segment.base.names {
                if name.text.is_empty() || !seen.insert(name.text.as_str()) {
                    continue;
                }
                by_name
                    .entry(name.text.clone())
                    .or_default()
                    .push(NamedSegment {
                        id,
                        line: line.clone(),
                        rect: line.bounding_rect(),
                        road_class: segment.road_class,
                        span: segment.address.span(),
                        name: name.clone(),
                    });
            }
        }
        by_name
    }
}

fn within_distance(a: &NamedSegment, b: &NamedSegment, config: &StreetConfig, units: f64) -> bool {
    let limit = config.distance_for(a.road_class, b.road_class) * units;
    if let (Some(ra), Some(rb)) = (a.rect, b.rect) {
        let pad = Coord { x: limit, y: limit };
        if !Rect::new(ra.min() - pad, ra.max() + pad).intersects(&rb) {
            return false;
        }
    }
    Euclidean.distance(&a.line, &b.line) <= limit
}

/// Puts every segment into each group it is close to, or a new one.
fn group_segments(segments: &[NamedSegment], config: &StreetConfig, units: f64) -> Vec<Group> {
    let mut groups: Vec<Group> = Vec::new();
    for (i, segment) in segments.iter().enumerate() {
        let mut joined = false;
        for group in &mut groups {
            if group
                .iter()
                .any(|&m| within_distance(segment, &segments[m], config, units))
            {
                group.insert(i);
                joined = true;
            }
        }
        if !joined {
            groups.push(Group::from([i]));
        }
    }
    groups
}

/// Unions groups sharing a member until all groups are disjoint.
fn merge_intersecting(groups: &mut Vec<Group>) {
    'restart: loop {
        for i in 0..groups.len() {
            for j in i + 1..groups.len() {
                if !groups[i].is_disjoint(&groups[j]) {
                    let other = groups.remove(j);
                    groups[i].extend(other);
                    continue 'restart;
                }
            }
        }
        return;
    }
}

/// Segment ends of a group not shared with another member of the group.
fn dangling_ends(group: &Group, segments: &[NamedSegment]) -> Vec<(usize, Endpoint)> {
    let ends: Vec<(usize, Endpoint, geo::Coord<f64>)> = group
        .iter()
        .flat_map(|&i| {
            let coords = &segments[i].line.0;
            [
                coords.first().map(|c| (i, Endpoint::Zero, *c)),
                coords.last().map(|c| (i, Endpoint::One, *c)),
            ]
        })
        .flatten()
        .collect();
    ends.iter()
        .filter(|(i, _, c)| !ends.iter().any(|(j, _, d)| j != i && d == c))
        .map(|&(i, e, _)| (i, e))
        .collect()
}

/// Joins groups whose dangling ends pass the same-street test. Returns the
/// number of joins.
fn merge_on_line(
    groups: &mut Vec<Group>,
    segments: &[NamedSegment],
    config: &StreetConfig,
    units: f64,
) -> usize {
    let mut merges = 0;
    'restart: loop {
        let dangling: Vec<Vec<(usize, Endpoint)>> =
            groups.iter().map(|g| dangling_ends(g, segments)).collect();
        for i in 0..groups.len() {
            for j in i + 1..groups.len() {
                let continues = dangling[i].iter().any(|&(a, ea)| {
                    dangling[j].iter().any(|&(b, eb)| {
                        same_street(
                            &segments[a].line,
                            ea,
                            &segments[b].line,
                            eb,
                            units,
                            &config.same_street,
                        )
                    })
                });
                if continues {
                    let other = groups.remove(j);
                    groups[i].extend(other);
                    merges += 1;
                    continue 'restart;
                }
            }
        }
        return merges;
    }
}
