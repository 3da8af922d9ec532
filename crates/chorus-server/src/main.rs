//! Main entry point for the Chorus demo server.
//!
//! Boots an in-process cluster, routes testdata subscribes through their
//! channel leaders and reports the cluster-wide managed channels.

use chorus_common::SignedInUser;
use chorus_server::{
    DemoCluster, ServerConfiguration,
    startup::{LoggingConfig, init_logging},
    testdata::{TESTDATA_STREAMS, testdata_channel},
};
use tracing::{error, info, warn};

const DEMO_ORG_ID: i64 = 1;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let configuration = ServerConfiguration::new()?;
    init_logging(&LoggingConfig::from_level(&configuration.log_level()))?;

    let survey_config = configuration.survey_config();
    info!(
        nodes = configuration.demo_nodes(),
        leader_check_timeout = ?survey_config.leader_check_timeout,
        subscribe_timeout = ?survey_config.subscribe_timeout,
        managed_streams_timeout = ?survey_config.managed_streams_timeout,
        "Starting Chorus demo cluster"
    );

    let cluster = DemoCluster::start(&configuration.node_ids(), survey_config)?;
    let nodes = cluster.nodes();

    let admin = SignedInUser {
        org_id: DEMO_ORG_ID,
        user_id: 1,
        login: "admin".to_string(),
        name: "Admin".to_string(),
        org_role: "Admin".to_string(),
    };
    cluster.identities().insert(admin.clone());

    // Spread leadership over the nodes and subscribe from a different node.
    let mut tokens = Vec::with_capacity(TESTDATA_STREAMS.len());
    for (i, (path, _)) in TESTDATA_STREAMS.iter().enumerate() {
        let channel = testdata_channel(path);
        let leader = nodes[i % nodes.len()].node_id();
        let subscriber = &nodes[(i + 1) % nodes.len()];
        let token = cluster.elect(DEMO_ORG_ID, &channel, leader);

        match subscriber
            .caller
            .call_plugin_subscribe_stream(&admin, &channel, leader, &token)
            .await
        {
            Ok((reply, status)) => info!(
                channel = %channel,
                from = %subscriber.node_id(),
                leader = %leader,
                status = %status,
                data = ?reply.data,
                "Subscribed through leader"
            ),
            Err(e) => error!(channel = %channel, leader = %leader, error = %e, "Subscribe failed"),
        }
        tokens.push((channel, leader.to_string(), token));
    }

    // A failover mints a new token, so subscribes carrying the old one are fenced.
    if let Some((channel, leader, stale)) = tokens.first() {
        cluster.elect(DEMO_ORG_ID, channel, leader);
        match nodes[0]
            .caller
            .call_plugin_subscribe_stream(&admin, channel, leader, stale)
            .await
        {
            Ok(_) => error!(channel = %channel, "Stale leadership token was accepted"),
            Err(e) => warn!(channel = %channel, error = %e, "Stale leadership token rejected"),
        }
    }

    let channels = nodes[0].caller.call_managed_streams(DEMO_ORG_ID).await?;
    info!(
        org_id = DEMO_ORG_ID,
        channels = channels.len(),
        "Cluster managed channels"
    );
    for channel in &channels {
        info!(
            channel = %channel.channel,
            minute_rate = channel.minute_rate,
            "Managed channel"
        );
    }

    Ok(())
}
