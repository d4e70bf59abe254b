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
use crate::{federation::TestServer, keys::User, mock::Delivery};
use rdrop_common::{task::run, JoinConvEnvelope, JoinedEnvelope, ServerEnvelope, TaskError};
use rdrop_delivery::DeliveryKind;
use rdrop_server::{maildrop::tasks::ConversationJoin, DeliveryOutcome};

/// `alice`, behind `inviter`, invites `bob` of `drop` to a conversation of `host`.
fn task(
    inviter: &TestServer,
    host: &TestServer,
    alice: &User,
    drop: &TestServer,
) -> ConversationJoin {
    ConversationJoin {
        inner: JoinConvEnvelope {
            name: "bob".to_string(),
            server_name: host.key(),
            payload: "boxed resend".to_string(),
        },
        outer: alice.transit_raw("opened earlier", &drop.key()),
        other_server_key: inviter.key(),
    }
}

#[test_log::test(tokio::test)]
async fn joined_goes_back_to_the_inviter() {
    let drop = TestServer::new("rdrop://drop.example.org:7400");
    let inviter = TestServer::new("rdrop://inviter.example.org:7400");
    let host = TestServer::new("rdrop://host.example.org:7400");
    let alice = User::new("alice");
    drop.learn(&inviter.peer).await;

    let task = task(&inviter, &host, &alice, &drop);
    let state = run(&task, &*drop.ctx).await.unwrap();

    assert_eq!(state.resent, Some(DeliveryOutcome::Delivered));
    assert_eq!(
        drop.auth.calls(),
        vec![
            "user_check_server_user",
            "user_authorize_server_for_conversation"
        ]
    );
    assert_eq!(
        drop.auth.conversation_servers(),
        vec![("bob".to_string(), host.key())]
    );
    pretty_assertions::assert_eq!(
        drop.transport.deliveries(),
        vec![Delivery {
            url: "rdrop://inviter.example.org:7400".parse().unwrap(),
            server_key: inviter.key(),
            kind: DeliveryKind::Server,
            envelope: serde_json::to_value(ServerEnvelope::Joined(JoinedEnvelope {
                name: alice.key(),
                nonce: task.outer.nonce,
                payload: "boxed resend".to_string(),
            }))
            .unwrap(),
        }]
    );
}

#[rstest::rstest]
#[case::not_a_contact("user_check_server_user", "check_authorization", 1)]
#[case::authorization_refused("user_authorize_server_for_conversation", "add_auth", 2)]
#[test_log::test(tokio::test)]
async fn refused(#[case] method: &'static str, #[case] step: &str, #[case] calls: usize) {
    let drop = TestServer::new("rdrop://drop.example.org:7400");
    let inviter = TestServer::new("rdrop://inviter.example.org:7400");
    let host = TestServer::new("rdrop://host.example.org:7400");
    drop.learn(&inviter.peer).await;
    drop.auth.deny(method);

    let failure = run(&task(&inviter, &host, &User::new("alice"), &drop), &*drop.ctx)
        .await
        .unwrap_err();

    assert_eq!(failure.task, "conversation_join");
    assert_eq!(failure.step, step);
    assert!(matches!(failure.error, TaskError::Unauthorized(_)));
    assert_eq!(drop.auth.calls().len(), calls);
    assert!(drop.auth.conversation_servers().is_empty());
    assert!(drop.transport.deliveries().is_empty());
}

#[test_log::test(tokio::test)]
async fn inviter_server_unknown() {
    let drop = TestServer::new("rdrop://drop.example.org:7400");
    let inviter = TestServer::new("rdrop://inviter.example.org:7400");
    let host = TestServer::new("rdrop://host.example.org:7400");

    let failure = run(&task(&inviter, &host, &User::new("alice"), &drop), &*drop.ctx)
        .await
        .unwrap_err();

    assert_eq!(failure.step, "resend_joined");
    assert!(matches!(failure.error, TaskError::UnknownServer(key) if key == inviter.key()));
    assert!(drop.transport.deliveries().is_empty());
}

#[test_log::test(tokio::test)]
async fn inviter_unreachable() {
    let drop = TestServer::new("rdrop://drop.example.org:7400");
    let inviter = TestServer::new("rdrop://inviter.example.org:7400");
    let host = TestServer::new("rdrop://host.example.org:7400");
    drop.learn(&inviter.peer).await;
    drop.transport.unreachable(inviter.key());

    let state = run(&task(&inviter, &host, &User::new("alice"), &drop), &*drop.ctx)
        .await
        .unwrap();

    assert_eq!(state.resent, Some(DeliveryOutcome::Failed));
    assert_eq!(drop.transport.deliveries().len(), 1);
}
