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
use rdrop_common::{task::run, TaskError, UserEnvelope};
use rdrop_server::maildrop::tasks::UserToUserMessage;

fn task(drop: &TestServer, relay: &TestServer, alice: &User) -> UserToUserMessage {
    UserToUserMessage {
        inner: UserEnvelope {
            name: "bob".to_string(),
            payload: "hi bob".to_string(),
        },
        outer: alice.transit_raw("opened earlier", &drop.key()),
        other_server_key: relay.key(),
    }
}

#[test_log::test(tokio::test)]
async fn hand_off() {
    let drop = TestServer::new("rdrop://drop.example.org:7400");
    let relay = TestServer::new("rdrop://relay.example.org:7400");
    let alice = User::new("alice");
    let task = task(&drop, &relay, &alice);

    run(&task, &*drop.ctx).await.unwrap();

    assert_eq!(drop.auth.calls(), vec!["user_check_server_user"]);
    pretty_assertions::assert_eq!(
        drop.store.user_messages(),
        vec![StoredMessage {
            to: "bob".to_string(),
            payload: "hi bob".to_string(),
            nonce: task.outer.nonce,
            sender_key: alice.key(),
        }]
    );
    assert!(drop.transport.deliveries().is_empty());
}

#[test_log::test(tokio::test)]
async fn not_a_contact() {
    let drop = TestServer::new("rdrop://drop.example.org:7400");
    let relay = TestServer::new("rdrop://relay.example.org:7400");
    drop.auth.deny("user_check_server_user");

    let failure = run(&task(&drop, &relay, &User::new("alice")), &*drop.ctx)
        .await
        .unwrap_err();

    assert_eq!(failure.task, "user_to_user_message");
    assert_eq!(failure.step, "check_authorized_to_talk_to_user");
    assert!(matches!(failure.error, TaskError::Unauthorized(_)));
    assert!(drop.store.user_messages().is_empty());
}

#[test_log::test(tokio::test)]
async fn storage_failure() {
    let drop = TestServer::new("rdrop://drop.example.org:7400");
    let relay = TestServer::new("rdrop://relay.example.org:7400");
    drop.store.fail();

    let failure = run(&task(&drop, &relay, &User::new("alice")), &*drop.ctx)
        .await
        .unwrap_err();

    assert_eq!(failure.step, "back_end_hand_off");
    assert!(matches!(failure.error, TaskError::Storage(_)));
}
