mod common;

use common::{builder, street};
use tilegraph_core::prelude::*;

#[test]
fn boundary_segment_is_unique_per_endpoint() {
    let mut builder = builder();
    let id = builder
        .add_feature(street("Edge Rd", &[(0.0, 0.0), (100.0, 0.0)]))
        .unwrap();
    let node = NodeRef::new(id, Endpoint::One);

    let created = builder.add_to_boundary(node).unwrap();
    let again = builder.add_to_boundary(node).unwrap();

    assert!(created.is_some());
    assert!(again.is_none());
    assert_eq!(builder.boundary().virtual_for(id, Endpoint::One), created);
    assert_eq!(builder.boundary().len(), 1);
    let features = builder.store().len();
    builder.add_to_boundary(node).unwrap();
    assert_eq!(builder.store().len(), features);

    // the other end gets its own segment
    let other = builder
        .add_to_boundary(NodeRef::new(id, Endpoint::Zero))
        .unwrap();
    assert!(other.is_some());
    assert_ne!(other, created);
}

#[test]
fn connecting_into_an_anchored_boundary_node_redirects() {
    let mut builder = builder();
    let a = builder
        .add_feature(street("", &[(0.0, 0.0), (100.0, 0.0)]))
        .unwrap();
    let b = builder
        .add_feature(street("", &[(100.0, 0.0), (200.0, 0.0)]))
        .unwrap();
    let virtual_id = builder
        .add_to_boundary(NodeRef::new(b, Endpoint::Zero))
        .unwrap()
        .unwrap();
    builder.validate().unwrap();

    builder.rebuild_index();
    let allow = ConnectOptions {
        allow_boundary: true,
        ..ConnectOptions::default()
    };
    builder.update_connections(a, &allow).unwrap();
    builder.validate().unwrap();

    let close = NodeRef::new(virtual_id, Endpoint::Zero);
    assert_eq!(builder.store().inbound_count(close), 1);
    let next = builder
        .boundary()
        .virtual_for(virtual_id, Endpoint::Zero)
        .unwrap();
    let a1 = NodeRef::new(a, Endpoint::One);
    assert!(builder.store().has_connection(a1, NodeRef::new(next, Endpoint::Zero)));
    assert!(!builder.store().has_connection(a1, close));
}

#[test]
fn tile_boundary_classifies_candidates() {
    let mut builder = builder();
    builder
        .add_feature(street("", &[(0.0, 0.0), (100.0, 0.0)]))
        .unwrap();
    builder
        .add_feature(street("", &[(100.0, 0.0), (100.0, 100.0)]))
        .unwrap();
    builder
        .add_feature(street("", &[(100.0, 100.0), (0.0, 100.0)]))
        .unwrap();

    let tile = builder.tile_boundary().unwrap();
    let classify = |x, y| tile.classify(geo::Coord { x, y }) as u8;
    assert_eq!(classify(50.0, 50.0), 2);
    assert_eq!(classify(100.0, 50.0), 1);
    assert_eq!(classify(150.0, 50.0), 0);

    let square = geo::Polygon::new(
        common::line(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0), (0.0, 0.0)]),
        vec![],
    );
    builder.set_tile_boundary(TileBoundary::new(square));
    let tile = builder.tile_boundary().unwrap();
    assert_eq!(
        tile.classify(geo::Coord { x: 50.0, y: 50.0 }),
        BoundaryPosition::Outside
    );
}

#[test]
fn external_connections_find_their_segments() {
    let mut builder = builder();
    let id = builder
        .add_feature(street("", &[(0.0, 0.0), (100.0, 0.0)]))
        .unwrap();
    let virtual_id = builder
        .add_to_boundary(NodeRef::new(id, Endpoint::One))
        .unwrap()
        .unwrap();
    let target = builder.boundary().get(virtual_id).unwrap().far_node();

    assert!(builder.add_external_connection(2, 0x1234, target));
    assert!(!builder.add_external_connection(2, 0x1234, target));
    assert_eq!(builder.boundary().external_connection_count(), 1);
    assert_eq!(
        builder.boundary().find_boundary_segments_from(2, 0x1234),
        vec![virtual_id]
    );
}
