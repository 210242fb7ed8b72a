#![allow(clippy::unwrap_used)]
// Projection of global sessions onto single endpoints

use sesstype::ast::{Expr, MsgPayload, MsgSig, Node, NodeKind, Role, Session, SessionKind};
use sesstype::project;

fn role(name: &str) -> Role {
    Role::new(name)
}

fn four_party() -> Node {
    Node::root(vec![
        Node::interaction(role("Alice"), [role("Bob"), role("Carol")], MsgSig::new("First")),
        Node::interaction(role("Alice"), [role("Carol")], MsgSig::new("Second")),
        Node::recursion(
            "Rec0",
            vec![
                Node::recursion(
                    "Rec1",
                    vec![Node::interaction(
                        role("Alice"),
                        [role("Mallory")],
                        MsgSig::new("Label"),
                    )],
                ),
                Node::continue_to("Rec0"),
            ],
        ),
        Node::interaction(role("Bob"), [role("Mallory"), role("Alice")], MsgSig::new("Third")),
    ])
}

#[test]
fn test_bob_view_of_four_party_protocol() {
    let local = project(&four_party(), &role("Bob")).unwrap();
    assert_eq!(local.kind(), NodeKind::Root);
    assert_eq!(local.num_children(), 3);

    let first = local.child(0).unwrap();
    assert_eq!(first.kind(), NodeKind::Recv);
    assert_eq!(first.message().unwrap().label(), "First");
    assert_eq!(first.interaction_ref().unwrap().sender, Some(role("Alice")));

    let outer = local.child(1).unwrap();
    assert_eq!(
        outer,
        &Node::recursion(
            "Rec0",
            vec![Node::recursion("Rec1", vec![]), Node::continue_to("Rec0")]
        )
    );

    let third = local.child(2).unwrap();
    assert_eq!(third.kind(), NodeKind::Send);
    assert_eq!(third.message().unwrap().label(), "Third");
    assert_eq!(
        third.interaction_ref().unwrap().receiver(),
        Some(&role("Mallory"))
    );
}

#[test]
fn test_alice_view_keeps_every_send() {
    let local = project(&four_party(), &role("Alice")).unwrap();
    let kinds: Vec<_> = local.children().map(Node::kind).collect();
    assert_eq!(
        kinds,
        [
            NodeKind::Send,
            NodeKind::Send,
            NodeKind::Recursion,
            NodeKind::Recv
        ]
    );
    let inner = local.at_path(&vec![2, 0].into()).unwrap();
    assert_eq!(inner.num_children(), 1);
}

#[test]
fn test_projection_is_idempotent() {
    for name in ["Alice", "Bob", "Carol", "Mallory", "Eve"] {
        let once = project(&four_party(), &role(name)).unwrap();
        let twice = project(&once, &role(name)).unwrap();
        assert_eq!(once, twice, "projection onto {name} is not idempotent");
    }
}

#[test]
fn test_uninvolved_role_keeps_control_structure() {
    let local = project(&four_party(), &role("Eve")).unwrap();
    assert_eq!(local.num_children(), 1);
    assert_eq!(local.child(0).map(Node::kind), Some(NodeKind::Recursion));
}

#[test]
fn test_payloads_and_guards_survive_projection() {
    let message = MsgSig::new("Data")
        .with_payload(MsgPayload::named("xs", "float").with_param(Expr::var("N")));
    let mut interaction = Node::interaction(
        role("Master"),
        [Role::new("Worker").with_param(Expr::var("i"))],
        message.clone(),
    );
    interaction
        .set_condition(Role::new("Worker").with_param(Expr::range(Expr::lit(1), Expr::var("N"))))
        .unwrap();
    let tree = Node::for_loop(
        "i",
        Expr::range(Expr::lit(1), Expr::var("N")),
        vec![interaction],
    );

    let local = project(&tree, &Role::new("Worker").with_param(Expr::lit(2))).unwrap();
    let recv = local.at_path(&vec![0, 0].into()).unwrap();
    assert_eq!(recv.kind(), NodeKind::Recv);
    assert_eq!(recv.message().unwrap(), &message);
    assert!(recv.interaction_ref().unwrap().condition.is_some());
}

#[test]
fn test_session_projection_carries_metadata() {
    let mut session = Session::new("FourParty");
    for name in ["Alice", "Bob", "Carol", "Mallory"] {
        session.add_role(role(name));
    }
    session.set_root(four_party());
    session.validate().unwrap();

    let local = session.project(&role("Carol")).unwrap();
    assert_eq!(local.kind(), SessionKind::Local);
    assert_eq!(local.name(), "FourParty");
    assert_eq!(local.endpoint(), Some(&role("Carol")));
    assert_eq!(local.num_roles(), 4);
    assert_eq!(local.root().num_children(), 3);
}
