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
mod federation;
mod tasks {
    mod conversation_join;
    mod conversation_joined;
    mod conversation_message;
    mod fanout_to_user;
    mod user_to_user;
}

use rdrop_common::PublicKey;
use rdrop_protocol::Request;

/// One line per request.
pub fn frames(requests: &[Request]) -> String {
    requests
        .iter()
        .map(|request| serde_json::to_string(request).unwrap() + "\n")
        .collect()
}

pub fn hello(server_key: PublicKey) -> Request {
    Request::Hello {
        server_key,
        self_ident: None,
    }
}

pub fn transit<T: serde::Serialize>(envelope: &T) -> Request {
    Request::DeliverTransit {
        msg: serde_json::to_value(envelope).unwrap(),
    }
}

pub fn server<T: serde::Serialize>(envelope: &T) -> Request {
    Request::DeliverServer {
        msg: serde_json::to_value(envelope).unwrap(),
    }
}

pub const ACK: &str = "{\"type\":\"ack\"}\n";
pub const BAD: &str = "{\"type\":\"bad\"}\n";
