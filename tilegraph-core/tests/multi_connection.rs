mod common;

use common::{builder, street};
use tilegraph_core::prelude::*;

fn five_nodes(builder: &mut TileBuilder) -> Vec<NodeRef> {
    (0..5)
        .map(|i| {
            let x = f64::from(i) * 10.0;
            let id = builder
                .add_feature(street("", &[(x, 0.0), (x + 10.0, 0.0)]))
                .unwrap();
            NodeRef::new(id, Endpoint::One)
        })
        .collect()
}

#[test]
fn degenerate_entry_is_rejected() {
    let mut builder = builder();
    let n = five_nodes(&mut builder);

    assert!(
        builder
            .add_multi_connection(
                n[0],
                n[4],
                vec![n[1], n[2], n[3]],
                VehicleRestriction::ALL,
                TurnDirection::Ahead,
            )
            .unwrap()
    );
    assert!(
        !builder
            .add_multi_connection(n[4], n[4], vec![], VehicleRestriction::ALL, TurnDirection::Ahead)
            .unwrap()
    );
    assert_eq!(builder.multi_connections().len(), 1);
    assert_eq!(
        builder.multi_connections().get(n[0], n[4]),
        Some(&[n[1], n[2], n[3]][..])
    );
}

#[test]
fn route_expansion_through_maneuvers() {
    let mut builder = builder();
    let n = five_nodes(&mut builder);
    builder
        .add_multi_connection(n[0], n[2], vec![n[1]], VehicleRestriction::ALL, TurnDirection::Right)
        .unwrap();
    builder
        .add_multi_connection(n[2], n[4], vec![n[3]], VehicleRestriction::ALL, TurnDirection::Left)
        .unwrap();

    let mut path = vec![n[0], n[2], n[4]];
    let len = builder.multi_connections().expand_node_path(&mut path);
    assert_eq!(len, 5);
    assert_eq!(path, n);

    let mut plain = vec![n[4], n[3]];
    assert_eq!(builder.multi_connections().expand_node_path(&mut plain), 2);
}

#[test]
fn removing_a_feature_drops_maneuvers_through_it() {
    let mut builder = builder();
    let n = five_nodes(&mut builder);
    builder
        .add_multi_connection(n[0], n[2], vec![n[1]], VehicleRestriction::ALL, TurnDirection::Right)
        .unwrap();
    builder.remove_feature(n[1].feature).unwrap();
    assert!(builder.multi_connections().is_empty());
}
