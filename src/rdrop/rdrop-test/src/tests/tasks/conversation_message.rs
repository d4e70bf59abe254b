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
use crate::{federation::TestServer, keys::User, mock::StoredMessage};
use rdrop_common::{
    task::run, ConvAddEnvelope, ConvMsgEnvelope, FannedMsgEnvelope, Participant, ServerEnvelope,
    TaskError,
};
use rdrop_delivery::DeliveryKind;
use rdrop_server::maildrop::tasks::{
    ConversationMessage, ConversationPost, RecipientsReport,
};

fn post(alice: &User, host: &TestServer, inner: ConversationPost) -> ConversationMessage {
    ConversationMessage {
        inner,
        outer: alice.transit_raw("opened earlier", &host.key()),
        other_server_key: User::new("alice-server").key(),
    }
}

fn message() -> ConversationPost {
    ConversationPost::Message(ConvMsgEnvelope {
        conv_id: "conv".to_string(),
        payload: "hello all".to_string(),
    })
}

#[test_log::test(tokio::test)]
async fn fan_out_to_every_participant() {
    let host = TestServer::new("rdrop://host.example.org:7400");
    let remote = TestServer::new("rdrop://remote.example.org:7400");
    host.learn(&remote.peer).await;
    host.store.set_participants(
        "conv",
        vec![
            Participant {
                name: "bob".to_string(),
                server_key: remote.key(),
            },
            Participant {
                name: "carol".to_string(),
                server_key: host.key(),
            },
        ],
    );

    let alice = User::new("alice");
    let task = post(&alice, &host, message());
    let state = run(&task, &*host.ctx).await.unwrap();

    assert_eq!(
        state.report,
        RecipientsReport {
            delivered: 2,
            failed: 0
        }
    );
    pretty_assertions::assert_eq!(
        host.store.conversation_messages(),
        vec![StoredMessage {
            to: "conv".to_string(),
            payload: "hello all".to_string(),
            nonce: task.outer.nonce,
            sender_key: alice.key(),
        }]
    );

    let deliveries = host.transport.deliveries();
    assert_eq!(deliveries.len(), 1);
    assert_eq!(deliveries[0].kind, DeliveryKind::Server);
    assert_eq!(deliveries[0].server_key, remote.key());
    assert_eq!(
        deliveries[0].envelope,
        serde_json::to_value(ServerEnvelope::FannedMsg(FannedMsgEnvelope {
            name: "bob".to_string(),
            nonce: task.outer.nonce,
            payload: "hello all".to_string(),
            conv_id: "conv".to_string(),
        }))
        .unwrap()
    );

    // carol is ours, the conversation server stands as the sender
    pretty_assertions::assert_eq!(
        host.store.user_messages(),
        vec![StoredMessage {
            to: "carol".to_string(),
            payload: "hello all".to_string(),
            nonce: task.outer.nonce,
            sender_key: host.key(),
        }]
    );
}

#[test_log::test(tokio::test)]
async fn added_participant_receives_the_announce() {
    let host = TestServer::new("rdrop://host.example.org:7400");
    let remote = TestServer::new("rdrop://remote.example.org:7400");
    host.learn(&remote.peer).await;

    let task = post(
        &User::new("alice"),
        &host,
        ConversationPost::Add(ConvAddEnvelope {
            conv_id: "conv".to_string(),
            name: "dave".to_string(),
            server_name: remote.key(),
            payload: "dave joins".to_string(),
        }),
    );
    let state = run(&task, &*host.ctx).await.unwrap();

    let dave = Participant {
        name: "dave".to_string(),
        server_key: remote.key(),
    };
    assert_eq!(host.store.participants("conv"), vec![dave.clone()]);
    assert_eq!(state.recipients, Some(vec![dave]));
    assert_eq!(state.report.delivered, 1);
    assert_eq!(host.transport.deliveries()[0].server_key, remote.key());

    // adding twice keeps a single member
    run(&task, &*host.ctx).await.unwrap();
    assert_eq!(host.store.participants("conv").len(), 1);
}

#[test_log::test(tokio::test)]
async fn failing_members_are_counted() {
    let host = TestServer::new("rdrop://host.example.org:7400");
    let unreachable = TestServer::new("rdrop://unreachable.example.org:7400");
    let unknown = TestServer::new("rdrop://unknown.example.org:7400");
    host.learn(&unreachable.peer).await;
    host.transport.unreachable(unreachable.key());
    host.store.set_participants(
        "conv",
        vec![
            Participant {
                name: "bob".to_string(),
                server_key: unreachable.key(),
            },
            Participant {
                name: "eve".to_string(),
                server_key: unknown.key(),
            },
            Participant {
                name: "carol".to_string(),
                server_key: host.key(),
            },
        ],
    );

    let state = run(&post(&User::new("alice"), &host, message()), &*host.ctx)
        .await
        .unwrap();

    assert_eq!(
        state.report,
        RecipientsReport {
            delivered: 1,
            failed: 2
        }
    );
    assert_eq!(host.store.user_messages().len(), 1);
}

#[test_log::test(tokio::test)]
async fn not_a_participant() {
    let host = TestServer::new("rdrop://host.example.org:7400");
    host.auth.deny("conv_check_server_conversation");

    let failure = run(&post(&User::new("mallory"), &host, message()), &*host.ctx)
        .await
        .unwrap_err();

    assert_eq!(failure.task, "conversation_message");
    assert_eq!(failure.step, "check_already_in_on_conversation");
    assert!(matches!(failure.error, TaskError::Unauthorized(_)));
    assert!(host.store.conversation_messages().is_empty());
    assert!(host.transport.deliveries().is_empty());
}

#[test_log::test(tokio::test)]
async fn storage_failure_stops_the_fan_out() {
    let host = TestServer::new("rdrop://host.example.org:7400");
    let remote = TestServer::new("rdrop://remote.example.org:7400");
    host.learn(&remote.peer).await;
    host.store.set_participants(
        "conv",
        vec![Participant {
            name: "bob".to_string(),
            server_key: remote.key(),
        }],
    );
    host.store.fail();

    let failure = run(&post(&User::new("alice"), &host, message()), &*host.ctx)
        .await
        .unwrap_err();

    assert_eq!(failure.step, "persist");
    assert!(matches!(failure.error, TaskError::Storage(_)));
    assert!(host.transport.deliveries().is_empty());
}
