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
use crate::{
    federation::TestServer,
    keys::User,
    mock::{Delivery, StoredMessage},
};
use rdrop_common::{
    task::run, ConvMsgEnvelope, InnerEnvelope, JoinedEnvelope, Keyring, Nonce,
    OuterTransitEnvelope, PublicKey, ResendPayload, TaskError,
};
use rdrop_delivery::DeliveryKind;
use rdrop_server::{maildrop::tasks::ConversationJoined, DeliveryOutcome};

fn conv_msg() -> String {
    serde_json::to_string(&InnerEnvelope::ConvMsg(ConvMsgEnvelope {
        conv_id: "conv".to_string(),
        payload: "hello all".to_string(),
    }))
    .unwrap()
}

/// `alice` wraps a conversation message for `host`, then boxes the `resend` for `drop`.
fn joined(
    alice: &User,
    drop: &PublicKey,
    host: &PublicKey,
    nonce: Nonce,
) -> (JoinedEnvelope, String) {
    let inner = alice.seal(&conv_msg(), &nonce, host);
    let resend = ResendPayload {
        payload: inner.clone(),
        server_name: *host,
    };
    (
        JoinedEnvelope {
            name: alice.key(),
            nonce,
            payload: alice.seal(&resend.to_json().unwrap(), &nonce, drop),
        },
        inner,
    )
}

#[test_log::test(tokio::test)]
async fn resend_to_the_conversation_server() {
    let drop = TestServer::new("rdrop://drop.example.org:7400");
    let invitee_server = TestServer::new("rdrop://invitee.example.org:7400");
    let host = TestServer::new("rdrop://host.example.org:7400");
    let alice = User::new("alice");
    let alice_root = User::new("alice-root").key();
    drop.auth.register_user(alice.key(), alice_root);
    drop.learn(&host.peer).await;

    let nonce = Nonce::random();
    let (msg, inner) = joined(&alice, &drop.key(), &host.key(), nonce);
    let task = ConversationJoined {
        msg,
        other_server_key: invitee_server.key(),
    };

    let state = run(&task, &*drop.ctx).await.unwrap();

    assert_eq!(
        state.resend,
        Some(ResendPayload {
            payload: inner.clone(),
            server_name: host.key(),
        })
    );
    assert_eq!(state.user_root_key, Some(alice_root));
    assert_eq!(state.resent, Some(DeliveryOutcome::Delivered));
    pretty_assertions::assert_eq!(
        drop.transport.deliveries(),
        vec![Delivery {
            url: "rdrop://host.example.org:7400".parse().unwrap(),
            server_key: host.key(),
            kind: DeliveryKind::Transit,
            envelope: serde_json::to_value(OuterTransitEnvelope {
                inner_envelope: inner,
                nonce,
                sender_key: alice.key(),
            })
            .unwrap(),
        }]
    );

    // the conversation server can open what it receives
    let outer: OuterTransitEnvelope =
        serde_json::from_value(drop.transport.deliveries()[0].envelope.clone()).unwrap();
    let opened = host
        .peer
        .boxing
        .open_box_utf8(&outer.inner_envelope, &outer.nonce, &outer.sender_key)
        .unwrap();
    assert_eq!(opened, conv_msg());
}

#[test_log::test(tokio::test)]
async fn conversation_hosted_here() {
    let drop = TestServer::new("rdrop://drop.example.org:7400");
    let invitee_server = TestServer::new("rdrop://invitee.example.org:7400");
    let alice = User::new("alice");

    let nonce = Nonce::random();
    let (msg, _) = joined(&alice, &drop.key(), &drop.key(), nonce);
    let task = ConversationJoined {
        msg,
        other_server_key: invitee_server.key(),
    };

    let state = run(&task, &*drop.ctx).await.unwrap();

    assert_eq!(state.resent, Some(DeliveryOutcome::Local));
    assert!(drop.transport.deliveries().is_empty());
    pretty_assertions::assert_eq!(
        drop.store.conversation_messages(),
        vec![StoredMessage {
            to: "conv".to_string(),
            payload: "hello all".to_string(),
            nonce,
            sender_key: alice.key(),
        }]
    );
}

#[test_log::test(tokio::test)]
async fn not_a_resend() {
    let drop = TestServer::new("rdrop://drop.example.org:7400");
    let alice = User::new("alice");
    let nonce = Nonce::random();

    let task = ConversationJoined {
        msg: JoinedEnvelope {
            name: alice.key(),
            nonce,
            payload: alice.seal(&conv_msg(), &nonce, &drop.key()),
        },
        other_server_key: TestServer::new("rdrop://invitee.example.org:7400").key(),
    };

    let failure = run(&task, &*drop.ctx).await.unwrap_err();

    assert_eq!(failure.task, "conversation_joined");
    assert_eq!(failure.step, "open_envelope");
    assert!(matches!(failure.error, TaskError::MalformedOrReplay(kind) if kind == "convmsg"));
    assert!(drop.auth.calls().is_empty());
    assert!(drop.transport.deliveries().is_empty());
}

#[test_log::test(tokio::test)]
async fn boxed_for_another_server() {
    let drop = TestServer::new("rdrop://drop.example.org:7400");
    let host = TestServer::new("rdrop://host.example.org:7400");
    let alice = User::new("alice");

    let (msg, _) = joined(&alice, &host.key(), &host.key(), Nonce::random());
    let task = ConversationJoined {
        msg,
        other_server_key: TestServer::new("rdrop://invitee.example.org:7400").key(),
    };

    let failure = run(&task, &*drop.ctx).await.unwrap_err();

    assert_eq!(failure.step, "open_envelope");
    assert!(matches!(failure.error, TaskError::Decrypt(_)));
    assert!(drop.auth.calls().is_empty());
}

#[test_log::test(tokio::test)]
async fn not_our_user() {
    let drop = TestServer::new("rdrop://drop.example.org:7400");
    let host = TestServer::new("rdrop://host.example.org:7400");
    drop.learn(&host.peer).await;
    drop.auth.deny("server_check_user_account_by_tell_key");

    let (msg, _) = joined(&User::new("mallory"), &drop.key(), &host.key(), Nonce::random());
    let task = ConversationJoined {
        msg,
        other_server_key: TestServer::new("rdrop://invitee.example.org:7400").key(),
    };

    let failure = run(&task, &*drop.ctx).await.unwrap_err();

    assert_eq!(failure.step, "check_named_user_is_our_user");
    assert!(matches!(failure.error, TaskError::Unauthorized(_)));
    assert!(drop.transport.deliveries().is_empty());
}
