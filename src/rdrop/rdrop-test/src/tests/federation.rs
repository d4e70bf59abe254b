/*
 * rdrop federated maildrop
 * Copyright (C) 2022 viridIT SAS
 *
 * This program is free software: you can redistribute it and/or modify it under
 * the terms of the GNU General Public License as published by the Free Software
 * Foundation, either version 3 of the License, or any later version.
 *
 * This program is distributed in the hope that it will be useful, but WITHOUT
 * ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
 * FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License along with
 * this program. If not, see https://www.gnu.org/licenses/.
 *
*/
use crate::{federation::Federation, keys::User, mock::StoredMessage};
use rdrop_common::{
    ConvAddEnvelope, ConvMsgEnvelope, InnerEnvelope, JoinConvEnvelope, Nonce,
    OuterTransitEnvelope, Participant, PublicKey, ResendPayload,
};
use rdrop_delivery::DeliveryKind;
use rdrop_server::DeliveryOutcome;

fn participant(name: &str, server_key: PublicKey) -> Participant {
    Participant {
        name: name.to_string(),
        server_key,
    }
}

/// alice (on `a`) invites bob (on `b`) to a conversation hosted by `c`.
#[test_log::test(tokio::test)]
async fn join_handshake() {
    let federation = Federation::default();
    let a = federation.server("rdrop://a.example.org:7400");
    let b = federation.server("rdrop://b.example.org:7400");
    let c = federation.server("rdrop://c.example.org:7400");
    a.learn(&b.peer).await;
    a.learn(&c.peer).await;
    b.learn(&a.peer).await;
    c.learn(&a.peer).await;
    c.learn(&b.peer).await;

    let (alice, bob) = (User::new("alice"), User::new("bob"));
    c.store
        .set_participants("conv", vec![participant("alice", a.key())]);

    // one nonce for the three boxes, each for a different server
    let nonce = Nonce::random();
    let convadd = serde_json::to_string(&InnerEnvelope::ConvAdd(ConvAddEnvelope {
        conv_id: "conv".to_string(),
        name: bob.name.clone(),
        server_name: b.key(),
        payload: "bob joined".to_string(),
    }))
    .unwrap();
    let resend = ResendPayload {
        payload: alice.seal(&convadd, &nonce, &c.key()),
        server_name: c.key(),
    };
    let join = serde_json::to_string(&InnerEnvelope::JoinConv(JoinConvEnvelope {
        name: bob.name.clone(),
        server_name: c.key(),
        payload: alice.seal(&resend.to_json().unwrap(), &nonce, &a.key()),
    }))
    .unwrap();
    let outer = OuterTransitEnvelope {
        inner_envelope: alice.seal(&join, &nonce, &b.key()),
        nonce,
        sender_key: alice.key(),
    };

    assert_eq!(
        a.ctx
            .sender
            .send_person_envelope_to_server(&a.ctx, &alice.key(), outer, &b.key())
            .await
            .unwrap(),
        DeliveryOutcome::Delivered
    );

    // b let c deliver the conversation to bob, and answered a
    assert_eq!(b.auth.conversation_servers(), vec![("bob".to_string(), c.key())]);
    let sent_by_b = b.transport.deliveries();
    assert_eq!(sent_by_b.len(), 1);
    assert_eq!(sent_by_b[0].kind, DeliveryKind::Server);
    assert_eq!(sent_by_b[0].server_key, a.key());

    // a forwarded the convadd to c, which recorded it
    assert_eq!(
        c.store.conversation_messages(),
        vec![StoredMessage {
            to: "conv".to_string(),
            payload: "bob joined".to_string(),
            nonce,
            sender_key: alice.key(),
        }]
    );
    assert_eq!(
        c.store.participants("conv"),
        vec![participant("alice", a.key()), participant("bob", b.key())]
    );

    // c fanned it out to both members
    let fanned = |server: &crate::federation::TestServer, name: &str| StoredMessage {
        to: name.to_string(),
        payload: "bob joined".to_string(),
        nonce,
        sender_key: server.key(),
    };
    assert_eq!(a.store.user_messages(), vec![fanned(&c, "alice")]);
    assert_eq!(b.store.user_messages(), vec![fanned(&c, "bob")]);
}

#[test_log::test(tokio::test)]
async fn fan_out_survives_a_failing_member() {
    let federation = Federation::default();
    let a = federation.server("rdrop://a.example.org:7400");
    let b = federation.server("rdrop://b.example.org:7400");
    let c = federation.server("rdrop://c.example.org:7400");
    let gone = federation.server("rdrop://gone.example.org:7400");
    let stranger = federation.server("rdrop://stranger.example.org:7400");
    for peer in [&a, &b, &gone] {
        c.learn(&peer.peer).await;
    }
    c.transport.unreachable(gone.key());
    b.auth.deny("user_check_server_conversation");

    c.store.set_participants(
        "conv",
        vec![
            participant("alice", a.key()),
            participant("bob", b.key()),
            participant("ghost", gone.key()),
            participant("nobody", stranger.key()),
            participant("carol", c.key()),
        ],
    );

    let alice = User::new("alice");
    let outer = alice.transit(
        &InnerEnvelope::ConvMsg(ConvMsgEnvelope {
            conv_id: "conv".to_string(),
            payload: "hello".to_string(),
        }),
        &c.key(),
    );
    a.learn(&c.peer).await;
    assert_eq!(
        a.ctx
            .sender
            .send_person_envelope_to_server(&a.ctx, &alice.key(), outer, &c.key())
            .await
            .unwrap(),
        DeliveryOutcome::Delivered
    );

    assert_eq!(c.store.conversation_messages().len(), 1);
    // delivered to a, refused by b, unreachable, unknown, local
    assert_eq!(a.store.user_messages().len(), 1);
    assert!(b.store.user_messages().is_empty());
    assert!(gone.store.user_messages().is_empty());
    assert_eq!(c.store.user_messages().len(), 1);
    assert_eq!(c.store.user_messages()[0].to, "carol");

    // no delivery is attempted to a server without a known url, nor to c itself
    assert_eq!(
        c.transport
            .deliveries()
            .iter()
            .map(|d| d.server_key)
            .collect::<std::collections::HashSet<_>>(),
        [a.key(), b.key(), gone.key()]
            .into_iter()
            .collect::<std::collections::HashSet<_>>()
    );
}

#[test_log::test(tokio::test)]
async fn refused_hello() {
    let federation = Federation::default();
    let a = federation.server("rdrop://a.example.org:7400");
    let b = federation.server("rdrop://b.example.org:7400");
    a.learn(&b.peer).await;
    b.auth.deny("server_check_server_auth");

    let alice = User::new("alice");
    let outer = alice.transit(
        &InnerEnvelope::ConvMsg(ConvMsgEnvelope {
            conv_id: "conv".to_string(),
            payload: "hello".to_string(),
        }),
        &b.key(),
    );

    assert_eq!(
        a.ctx
            .sender
            .send_person_envelope_to_server(&a.ctx, &alice.key(), outer, &b.key())
            .await
            .unwrap(),
        DeliveryOutcome::Failed
    );
    assert_eq!(b.auth.calls(), vec!["server_check_server_auth"]);
}
