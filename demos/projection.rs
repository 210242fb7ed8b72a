// Demonstration of projection and asynchronous comparison
// Builds a master/worker protocol, projects it onto one worker and checks a
// hand-written local implementation against the projection.
//
// Run with `RUST_LOG=sesstype=trace` to see the comparator's decisions.

use anyhow::{bail, Result};
use sesstype::ast::{Expr, MsgPayload, MsgSig, Node, Role, Session};
use sesstype::{compare, CompareOutcome, Side};
use tracing_subscriber::EnvFilter;

fn worker(idx: Expr) -> Role {
    Role::new("Worker").with_param(idx)
}

fn job() -> MsgSig {
    MsgSig::new("Job").with_payload(MsgPayload::named("input", "int"))
}

fn log() -> MsgSig {
    MsgSig::new("Log").with_payload(MsgPayload::new("string"))
}

fn result() -> MsgSig {
    MsgSig::new("Result").with_payload(MsgPayload::named("output", "int"))
}

fn farm() -> Session {
    let master = || Role::new("Master");
    let i = || Expr::var("i");

    let mut session = Session::new("Farm");
    session.add_role(master());
    session.add_role(Role::new("Logger"));
    session.add_role(worker(Expr::range(Expr::lit(1), Expr::var("N"))));
    session.set_root(Node::root(vec![Node::recursion(
        "Round",
        vec![
            Node::interaction(master(), [worker(i())], job()),
            Node::interaction(worker(i()), [Role::new("Logger")], log()),
            Node::interaction(worker(i()), [master()], result()),
            Node::continue_to("Round"),
        ],
    )]));
    session
}

/// Local implementation that logs before it picks up its job
fn implementation() -> Node {
    Node::root(vec![Node::recursion(
        "Loop",
        vec![
            Node::send(Role::new("Logger"), log()),
            Node::recv(Role::new("Master"), job()),
            Node::send(Role::new("Master"), result()),
            Node::continue_to("Loop"),
        ],
    )])
}

fn report(outcome: &CompareOutcome) {
    for side in [Side::Left, Side::Right] {
        for path in outcome.marked(side) {
            println!("  differs on the {side} side at {path}");
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let session = farm();
    session.validate()?;

    let local = session.project(&worker(Expr::var("i")))?;
    println!("Projected {} onto Worker[i]:", local.name());
    for node in local.root().children().flat_map(|n| n.children()) {
        match node {
            Node::Send(interaction) | Node::Recv(interaction) => {
                println!("  {} {interaction}", node.kind())
            }
            other => println!("  {}", other.kind()),
        }
    }

    let outcome = compare(local.root(), &implementation())?;
    println!("Implementation matches projection: {}", outcome.identical);
    report(&outcome);
    if !outcome.identical {
        bail!("implementation does not follow the protocol");
    }
    Ok(())
}
