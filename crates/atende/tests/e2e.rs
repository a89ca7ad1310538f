// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests: raw gateway events in, persisted state and outbound
//! side effects out, with all external collaborators mocked.

use std::sync::Arc;

use atende_arbiter::{ArbiterSettings, ResponseArbiter};
use atende_config::model::{GatewayConfig, MediaConfig};
use atende_core::event::RawMessageContent;
use atende_core::types::{ConversationMode, MessageStatus};
use atende_ingest::{IdentityResolver, IngestionPipeline, MediaRehoster, StatusReconciler};
use atende_policy::{AssignmentEngine, TicketManager};
use atende_storage::Database;
use atende_storage::models::MessageRecord;
use atende_storage::queries::{
    agent_configs, contacts, conversations, instances, messages, reactions, rules, sectors,
    tickets,
};
use atende_test_utils::{
    CollectingRealtime, CollectingWebhook, EventBuilder, MemoryMediaStore, MockCompletion,
    MockGateway, agent_config_fixture, round_robin_rule_fixture, sector_fixture, temp_database,
};

const USER_JID: &str = "5511999999999@s.whatsapp.net";

struct World {
    db: Arc<Database>,
    gateway: Arc<MockGateway>,
    completion: Arc<MockCompletion>,
    arbiter: Arc<ResponseArbiter>,
    webhook: Arc<CollectingWebhook>,
    pipeline: IngestionPipeline,
    _dir: tempfile::TempDir,
}

async fn world() -> World {
    let (db, dir) = temp_database().await;
    let db = Arc::new(db);
    let gateway = MockGateway::new();
    let completion = MockCompletion::new();
    let realtime = CollectingRealtime::new();
    let webhook = CollectingWebhook::new();

    let transport: Arc<dyn atende_core::GatewayTransport> = gateway.clone();
    let gateway_config = GatewayConfig {
        transient_hosts: vec!["mmg.whatsapp.net".to_string()],
        ..GatewayConfig::default()
    };
    let media_config = MediaConfig {
        dir: dir.path().join("media").to_string_lossy().into_owned(),
        fallback_dir: dir.path().join("fallback").to_string_lossy().into_owned(),
    };

    let arbiter = Arc::new(ResponseArbiter::new(
        Arc::clone(&db),
        transport.clone(),
        completion.clone(),
        ArbiterSettings::default(),
    ));
    let pipeline = IngestionPipeline::new(
        Arc::clone(&db),
        IdentityResolver::new(Arc::clone(&db), transport.clone()),
        MediaRehoster::new(
            transport.clone(),
            MemoryMediaStore::new(),
            gateway_config,
            &media_config,
        )
        .unwrap(),
        StatusReconciler::new(Arc::clone(&db), realtime.clone(), webhook.clone()),
        AssignmentEngine::new(Arc::clone(&db)),
        TicketManager::new(Arc::clone(&db), transport.clone()),
        Arc::clone(&arbiter),
        realtime,
        webhook.clone(),
    );

    World {
        db,
        gateway,
        completion,
        arbiter,
        webhook,
        pipeline,
        _dir: dir,
    }
}

/// Seed a sector (default, individual ticketing), an enabled hybrid-ready
/// agent config, and a round-robin rule.
async fn seed_policy(w: &World) -> (String, String) {
    let instance = instances::upsert_instance(&w.db, "main").await.unwrap();
    let sector = sector_fixture(&instance.id);
    sectors::insert_sector(&w.db, &sector).await.unwrap();
    agent_configs::insert_config(&w.db, &agent_config_fixture(&sector.id))
        .await
        .unwrap();
    rules::insert_rule(&w.db, &round_robin_rule_fixture(&instance.id, &["A", "B", "C"]))
        .await
        .unwrap();
    (instance.id, sector.id)
}

async fn message_count(db: &Database, gateway_id: &str) -> i64 {
    let gateway_id = gateway_id.to_string();
    db.connection()
        .call(move |conn| {
            let n = conn.query_row(
                "SELECT count(*) FROM messages WHERE gateway_id = ?1",
                rusqlite::params![gateway_id],
                |row| row.get(0),
            )?;
            Ok(n)
        })
        .await
        .unwrap()
}

#[tokio::test]
async fn duplicate_delivery_results_in_exactly_one_message_row() {
    let w = world().await;
    let event = EventBuilder::new("main", USER_JID)
        .gateway_id("GW-DUP")
        .text("ola!");

    w.pipeline.handle_event(&event).await.unwrap();
    w.pipeline.handle_event(&event).await.unwrap();
    w.pipeline.handle_event(&event).await.unwrap();

    assert_eq!(message_count(&w.db, "GW-DUP").await, 1);
}

#[tokio::test]
async fn out_of_order_receipts_never_regress_final_status() {
    let w = world().await;
    w.pipeline
        .handle_event(
            &EventBuilder::new("main", USER_JID)
                .gateway_id("GW-1")
                .from_me(true)
                .text("enviada"),
        )
        .await
        .unwrap();

    // [sent, delivered, read, delivered] with the last receipt
    // re-delivered out of order.
    for status in ["SERVER_ACK", "DELIVERY_ACK", "READ", "DELIVERY_ACK"] {
        w.pipeline
            .handle_event(
                &EventBuilder::new("main", USER_JID)
                    .gateway_id("GW-1")
                    .receipt(status),
            )
            .await
            .unwrap();
    }

    let message = messages::find_by_gateway_id(&w.db, "GW-1").await.unwrap().unwrap();
    assert_eq!(message.status, MessageStatus::Read);
}

#[tokio::test]
async fn round_robin_distributes_b_c_a_from_cursor_zero() {
    let w = world().await;
    seed_policy(&w).await;

    let jids = [
        "5511911111111@s.whatsapp.net",
        "5511922222222@s.whatsapp.net",
        "5511933333333@s.whatsapp.net",
    ];
    for jid in jids {
        w.pipeline
            .handle_event(&EventBuilder::new("main", jid).text("oi"))
            .await
            .unwrap();
    }

    let mut assigned = Vec::new();
    for jid in jids {
        let phone = jid.split('@').next().unwrap();
        let instance = instances::get_instance(&w.db, "main").await.unwrap().unwrap();
        let contact = contacts::find_by_phone(&w.db, &instance.id, phone)
            .await
            .unwrap()
            .unwrap();
        let (conversation, _) =
            conversations::create_or_get(&w.db, &instance.id, &contact.id, ConversationMode::Human)
                .await
                .unwrap();
        assigned.push(conversation.assigned_to.unwrap());
    }
    assert_eq!(assigned, vec!["B", "C", "A"]);
}

/// Seed a hybrid conversation whose latest customer message is 10 minutes
/// old (past the 5-minute timeout). Completion failures during seeding
/// keep automation from replying prematurely.
async fn seed_hybrid_with_stale_customer_message(w: &World, instance_id: &str) -> String {
    w.completion.set_fail(true);
    let twenty_min_ago = (chrono::Utc::now() - chrono::Duration::minutes(20)).timestamp();
    w.pipeline
        .handle_event(
            &EventBuilder::new("main", USER_JID)
                .timestamp(twenty_min_ago)
                .text("primeiro contato"),
        )
        .await
        .unwrap();
    w.completion.set_fail(false);

    let contact = contacts::find_by_phone(&w.db, instance_id, "5511999999999")
        .await
        .unwrap()
        .unwrap();
    let (conversation, _) =
        conversations::create_or_get(&w.db, instance_id, &contact.id, ConversationMode::Human)
            .await
            .unwrap();
    conversations::set_mode(&w.db, &conversation.id, ConversationMode::Hybrid)
        .await
        .unwrap();

    let mut customer = MessageRecord::inbound(&conversation.id, "GW-T0", "ainda preciso de ajuda");
    customer.created_at = (chrono::Utc::now() - chrono::Duration::minutes(10)).to_rfc3339();
    messages::insert_message(&w.db, &customer).await.unwrap();
    conversation.id
}

#[tokio::test]
async fn hybrid_with_human_reply_never_generates_automation() {
    let w = world().await;
    let (instance_id, _sector_id) = seed_policy(&w).await;
    let conversation_id = seed_hybrid_with_stale_customer_message(&w, &instance_id).await;

    // A human replied one minute after the customer.
    let mut human = MessageRecord::outbound(&conversation_id, "GW-T1", "estou vendo aqui", false);
    human.created_at = (chrono::Utc::now() - chrono::Duration::minutes(9)).to_rfc3339();
    messages::insert_message(&w.db, &human).await.unwrap();

    // Neither the sweep nor the event-driven path ever replies.
    let stats = w.arbiter.sweep().await.unwrap();
    assert_eq!(stats.replied, 0);
    let outcome = w
        .arbiter
        .on_contact_message(&conversation_id, "ainda preciso de ajuda")
        .await
        .unwrap();
    assert_eq!(outcome, atende_arbiter::ReplyOutcome::AlreadyHandled);
    let stats = w.arbiter.sweep().await.unwrap();
    assert_eq!(stats.replied, 0);

    assert!(w.gateway.sent().await.is_empty());
    assert_eq!(w.completion.call_count(), 0);
}

#[tokio::test]
async fn hybrid_replies_exactly_once_between_event_path_and_sweep() {
    let w = world().await;
    let (instance_id, _sector_id) = seed_policy(&w).await;
    let conversation_id = seed_hybrid_with_stale_customer_message(&w, &instance_id).await;
    w.completion.add_response("estou aqui!").await;

    // Sweep fires first; the event path and further sweeps hit the guard.
    let stats = w.arbiter.sweep().await.unwrap();
    assert_eq!(stats.replied, 1);
    let outcome = w
        .arbiter
        .on_contact_message(&conversation_id, "ainda preciso de ajuda")
        .await
        .unwrap();
    assert_eq!(outcome, atende_arbiter::ReplyOutcome::AlreadyHandled);
    let stats = w.arbiter.sweep().await.unwrap();
    assert_eq!(stats.replied, 0);

    assert_eq!(w.gateway.sent().await.len(), 1);
    assert_eq!(w.completion.call_count(), 1);
}

#[tokio::test]
async fn escalation_keyword_flips_mode_and_suppresses_reply() {
    let w = world().await;
    let (instance_id, _sector_id) = seed_policy(&w).await;

    // agent_config_fixture escalates on "atendente".
    w.pipeline
        .handle_event(&EventBuilder::new("main", USER_JID).text("quero um atendente humano"))
        .await
        .unwrap();

    let contact = contacts::find_by_phone(&w.db, &instance_id, "5511999999999")
        .await
        .unwrap()
        .unwrap();
    let (conversation, _) =
        conversations::create_or_get(&w.db, &instance_id, &contact.id, ConversationMode::Human)
            .await
            .unwrap();
    assert_eq!(conversation.mode, ConversationMode::Human);
    assert!(w.gateway.sent().await.is_empty());
    assert_eq!(w.completion.call_count(), 0);
}

#[tokio::test]
async fn empty_emoji_reaction_removes_the_reactors_row() {
    let w = world().await;
    w.pipeline
        .handle_event(
            &EventBuilder::new("main", USER_JID)
                .gateway_id("GW-TARGET")
                .text("mensagem"),
        )
        .await
        .unwrap();

    let react = |emoji: &str| -> RawMessageContent {
        serde_json::from_value(serde_json::json!({
            "reactionMessage": {
                "key": { "id": "GW-TARGET", "remoteJid": USER_JID },
                "text": emoji
            }
        }))
        .unwrap()
    };

    w.pipeline
        .handle_event(&EventBuilder::new("main", USER_JID).payload(react("\u{1F44D}")))
        .await
        .unwrap();
    let target = messages::find_by_gateway_id(&w.db, "GW-TARGET").await.unwrap().unwrap();
    assert_eq!(reactions::list_for_message(&w.db, &target.id).await.unwrap().len(), 1);

    w.pipeline
        .handle_event(&EventBuilder::new("main", USER_JID).payload(react("")))
        .await
        .unwrap();
    assert!(reactions::list_for_message(&w.db, &target.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn deletion_preserves_content_for_audit() {
    let w = world().await;
    w.pipeline
        .handle_event(
            &EventBuilder::new("main", USER_JID)
                .gateway_id("GW-DEL")
                .text("mensagem comprometedora"),
        )
        .await
        .unwrap();

    w.pipeline
        .handle_event(&EventBuilder::new("main", USER_JID).gateway_id("GW-DEL").delete())
        .await
        .unwrap();

    let message = messages::find_by_gateway_id(&w.db, "GW-DEL").await.unwrap().unwrap();
    assert!(message.deleted);
    assert_eq!(message.content, "mensagem comprometedora");
    assert!(message.deleted_at.is_some());
    assert_eq!(message.deleted_by.as_deref(), Some("contact"));
}

#[tokio::test]
async fn first_contact_opens_a_ticket_and_gets_an_ai_reply() {
    let w = world().await;
    seed_policy(&w).await;
    w.completion.add_response("Bem-vindo! Como posso ajudar?").await;

    w.pipeline
        .handle_event(&EventBuilder::new("main", USER_JID).push_name("Maria").text("oi"))
        .await
        .unwrap();

    let instance = instances::get_instance(&w.db, "main").await.unwrap().unwrap();
    let contact = contacts::find_by_phone(&w.db, &instance.id, "5511999999999")
        .await
        .unwrap()
        .unwrap();
    let (conversation, _) =
        conversations::create_or_get(&w.db, &instance.id, &contact.id, ConversationMode::Human)
            .await
            .unwrap();

    let ticket = tickets::active_for_conversation(&w.db, &conversation.id)
        .await
        .unwrap()
        .expect("ticket should be open");
    assert_eq!(ticket.number, 1);

    let sent = w.gateway.sent().await;
    assert_eq!(sent.len(), 1);
    assert!(sent[0].text.contains("Bem-vindo!"));

    let names = w.webhook.event_names();
    assert!(names.contains(&"new_conversation".to_string()));
    assert!(names.contains(&"new_message".to_string()));
}
