use rabval_core::model::Definitions;
use rabval_core::relations::UsageRecord;
use serde_json::{json, Value};

/// A small but complete definitions export
///
/// Two vhosts with traffic (`/` and `isolated`) plus `empty_vhost`, which has
/// nothing in it. Every exchange and queue is bound.
#[allow(dead_code)]
pub fn full_json() -> Value {
    json!({
        "rabbit_version": "3.12.13",
        "rabbitmq_version": "3.12.13",
        "product_name": "RabbitMQ",
        "product_version": "3.12.13",
        "users": [{
            "name": "guest",
            "password_hash": "BMfxN8drrYcIqXZMr+pWTpDT0nMcOagMduLX0bjr4jwud/pN",
            "hashing_algorithm": "rabbit_password_hashing_sha256",
            "tags": ["administrator"],
            "limits": {}
        }],
        "vhosts": [{ "name": "/" }, { "name": "isolated" }, { "name": "empty_vhost" }],
        "permissions": [{ "user": "guest", "vhost": "/", "configure": ".*", "write": ".*", "read": ".*" }],
        "topic_permissions": [],
        "parameters": [],
        "global_parameters": [{ "name": "cluster_name", "value": "rabbit@localhost" }],
        "policies": [{
            "vhost": "/", "name": "ha", "pattern": "^defect", "apply-to": "queues",
            "definition": { "max-length": 1000 }, "priority": 0
        }],
        "queues": [
            { "name": "defect_queue", "vhost": "/", "durable": true, "auto_delete": false,
              "arguments": { "x-queue-type": "classic" } },
            { "name": "defect_queue", "vhost": "isolated", "durable": true, "auto_delete": false,
              "arguments": {} }
        ],
        "exchanges": [
            { "name": "defect_headers", "vhost": "/", "type": "headers", "durable": true,
              "auto_delete": false, "internal": false, "arguments": {} },
            { "name": "defect_topic", "vhost": "/", "type": "topic", "durable": true,
              "auto_delete": false, "internal": false, "arguments": {} },
            { "name": "anotherex2", "vhost": "/", "type": "direct", "durable": true,
              "auto_delete": false, "internal": false, "arguments": {} },
            { "name": "isolated_defect_headers", "vhost": "isolated", "type": "headers",
              "durable": true, "auto_delete": false, "internal": false, "arguments": {} }
        ],
        "bindings": [
            { "source": "defect_headers", "vhost": "/", "destination": "defect_queue",
              "destination_type": "queue", "routing_key": "",
              "arguments": { "x-match": "any", "h1": "v1" } },
            { "source": "defect_topic", "vhost": "/", "destination": "defect_queue",
              "destination_type": "queue", "routing_key": "orders.#", "arguments": {} },
            { "source": "anotherex2", "vhost": "/", "destination": "defect_topic",
              "destination_type": "exchange", "routing_key": "orders.created", "arguments": {} },
            { "source": "isolated_defect_headers", "vhost": "isolated", "destination": "defect_queue",
              "destination_type": "queue", "routing_key": "",
              "arguments": { "x-match": "all", "h2": "v2" } }
        ]
    })
}

#[allow(dead_code)]
pub fn full() -> Definitions {
    Definitions::from_value(full_json()).unwrap()
}

/// Usage observed for every queue and exchange of [`full`]
#[allow(dead_code)]
pub fn full_usage() -> Vec<UsageRecord> {
    serde_json::from_value(json!([
        { "vhost": "/", "queue": "defect_queue", "exchange": "anotherex2" },
        { "vhost": "/", "queue": "defect_queue", "exchange": "defect_topic" },
        { "vhost": "/", "queue": "defect_queue", "exchange": "defect_headers" },
        { "vhost": "isolated", "queue": "defect_queue", "exchange": "isolated_defect_headers" },
        { "vhost": "empty_vhost" }
    ]))
    .unwrap()
}

/// A queue in vhost `/` with the given name
#[allow(dead_code)]
pub fn queue_json(name: &str) -> Value {
    json!({ "name": name, "vhost": "/", "durable": true, "auto_delete": false, "arguments": {} })
}
