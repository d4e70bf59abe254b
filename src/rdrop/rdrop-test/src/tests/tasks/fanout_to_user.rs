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
use crate::{federation::TestServer, mock::StoredMessage};
use rdrop_common::{task::run, FannedMsgEnvelope, Nonce, TaskError};
use rdrop_server::maildrop::tasks::FanoutToUserMessage;

fn task(conversation_server: &TestServer) -> FanoutToUserMessage {
    FanoutToUserMessage {
        envelope: FannedMsgEnvelope {
            name: "bob".to_string(),
            nonce: Nonce([5; 24]),
            payload: "to everyone".to_string(),
            conv_id: "conv".to_string(),
        },
        other_server_key: conversation_server.key(),
    }
}

#[test_log::test(tokio::test)]
async fn hand_off_as_the_conversation_server() {
    let drop = TestServer::new("rdrop://drop.example.org:7400");
    let conversation_server = TestServer::new("rdrop://conv.example.org:7400");

    run(&task(&conversation_server), &*drop.ctx).await.unwrap();

    assert_eq!(drop.auth.calls(), vec!["user_check_server_conversation"]);
    pretty_assertions::assert_eq!(
        drop.store.user_messages(),
        vec![StoredMessage {
            to: "bob".to_string(),
            payload: "to everyone".to_string(),
            nonce: Nonce([5; 24]),
            sender_key: conversation_server.key(),
        }]
    );
}

#[test_log::test(tokio::test)]
async fn conversation_server_not_allowed() {
    let drop = TestServer::new("rdrop://drop.example.org:7400");
    drop.auth.deny("user_check_server_conversation");

    let failure = run(
        &task(&TestServer::new("rdrop://conv.example.org:7400")),
        &*drop.ctx,
    )
    .await
    .unwrap_err();

    assert_eq!(failure.task, "fanout_to_user_message");
    assert_eq!(failure.step, "check_authorized_conversation");
    assert!(matches!(failure.error, TaskError::Unauthorized(_)));
    assert!(drop.store.user_messages().is_empty());
}
