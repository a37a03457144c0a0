// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Engine facade over groups and links.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;

use super::builder::EngineBuilder;
use super::configuration::EngineConfiguration;
use crate::core::channel_ref::ChannelRef;
use crate::core::config::EngineConfig;
use crate::core::delegates::{FieldReading, FieldStorageDelegate, LinkDelegate, TransportDelegate};
use crate::core::error::{FieldLinkError, Result};
use crate::core::group::{Group, GroupDefinition, GroupRuntime, GroupSnapshot, GroupSubscription};
use crate::core::links::{
    ChannelKey, ConnectionEvent, LinkId, LinkManager, LinkSpec, LinkState, PutTicket,
    RemoteUpdate,
};
use crate::core::monitor::{FlowControl, MonitorQueueStats, QueueDepth};
use crate::core::value::TypedValue;

/// Where a storage channel appears in the installed groups.
#[derive(Debug, Clone, PartialEq, Eq)]
struct FieldSite {
    group: String,
    field: String,
}

/// The aggregation and link engine.
///
/// All methods take `&self`; share it across threads behind an `Arc`.
pub struct Engine {
    config: EngineConfig,
    storage: Arc<dyn FieldStorageDelegate>,
    groups: RwLock<HashMap<String, Arc<GroupRuntime>>>,
    sites: RwLock<HashMap<ChannelRef, Vec<FieldSite>>>,
    links: Arc<LinkManager>,
}

impl Engine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    pub(super) fn new(
        config: EngineConfig,
        storage: Arc<dyn FieldStorageDelegate>,
        transport: Arc<dyn TransportDelegate>,
        link_delegate: Arc<dyn LinkDelegate>,
    ) -> Self {
        let links = Arc::new(LinkManager::new(
            config.clone(),
            Arc::clone(&storage),
            transport,
            link_delegate,
        ));
        Self {
            config,
            storage,
            groups: RwLock::new(HashMap::new()),
            sites: RwLock::new(HashMap::new()),
            links,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // =========================================================================
    // Groups
    // =========================================================================

    pub fn define_group(&self, definition: GroupDefinition) -> Result<()> {
        let group = Group::build(definition)?;
        let mut groups = self.groups.write();
        if groups.contains_key(group.name()) {
            return Err(FieldLinkError::Configuration(format!(
                "group '{}' is already defined",
                group.name()
            )));
        }
        self.install_group(&mut groups, group);
        Ok(())
    }

    pub fn remove_group(&self, name: &str) -> Result<()> {
        let runtime = {
            let mut groups = self.groups.write();
            let runtime = groups
                .remove(name)
                .ok_or_else(|| FieldLinkError::NotFound(format!("group '{}'", name)))?;
            self.unindex(&runtime);
            runtime
        };
        runtime.close();
        tracing::info!("[{}] removed group", name);
        Ok(())
    }

    pub fn group(&self, name: &str) -> Option<Arc<GroupRuntime>> {
        self.groups.read().get(name).cloned()
    }

    pub fn group_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.groups.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Install a batch of groups and links, or nothing.
    ///
    /// Every descriptor is validated first. Links are defined next and the
    /// groups become visible only once every link is in place; if a link
    /// fails, the links already defined by this call are removed again.
    pub fn apply_configuration(&self, configuration: EngineConfiguration) -> Result<Vec<LinkId>> {
        let built = configuration.build_groups()?;
        self.check_group_names(&built, &self.groups.read())?;

        let mut link_ids = Vec::with_capacity(configuration.links.len());
        for link in configuration.links {
            match self.links.define_link(link.local, link.spec) {
                Ok(id) => link_ids.push(id),
                Err(e) => {
                    tracing::warn!("configuration rejected, rolling back: {}", e);
                    self.roll_back_links(&link_ids);
                    return Err(e);
                }
            }
        }

        let group_count = built.len();
        {
            let mut groups = self.groups.write();
            // A concurrent define_group may have claimed a name meanwhile.
            if let Err(e) = self.check_group_names(&built, &groups) {
                drop(groups);
                tracing::warn!("configuration rejected, rolling back: {}", e);
                self.roll_back_links(&link_ids);
                return Err(e);
            }
            for group in built {
                self.install_group(&mut groups, group);
            }
        }

        tracing::info!(
            "applied configuration: {} groups, {} links",
            group_count,
            link_ids.len()
        );
        Ok(link_ids)
    }

    /// Subscribe to a group's updates.
    ///
    /// `depth` defaults to the configured depth. Use [`Engine::get_group`] for
    /// the initial full value.
    pub fn subscribe_group(
        &self,
        name: &str,
        depth: Option<QueueDepth>,
        flow: FlowControl,
    ) -> Result<GroupSubscription> {
        let runtime = self.require_group(name)?;
        let depth = depth.unwrap_or_else(|| QueueDepth::from(self.config.default_queue_depth));
        Ok(runtime.subscribe(depth, self.config.max_queue_depth, flow))
    }

    /// Storage callback after a field's value, alarm or time changed.
    ///
    /// Returns how many group snapshots were published. Failures are logged
    /// and scoped to their group.
    pub fn field_changed(&self, channel: &ChannelRef) -> usize {
        let sites = match self.sites.read().get(channel) {
            Some(sites) => sites.clone(),
            None => return 0,
        };

        let mut published = 0;
        for site in sites {
            let Some(runtime) = self.group(&site.group) else {
                continue;
            };
            match runtime.field_changed(&site.field, self.storage.as_ref()) {
                Ok(Some(_)) => published += 1,
                Ok(None) => {}
                Err(e) => tracing::warn!(
                    "[{}] update for '{}' failed: {}",
                    site.group,
                    site.field,
                    e
                ),
            }
        }
        published
    }

    /// Full snapshot of every projected field in a group.
    pub fn get_group(&self, name: &str) -> Result<GroupSnapshot> {
        self.require_group(name)?.full_snapshot(self.storage.as_ref())
    }

    /// Write through a group in put order.
    pub fn put_group(&self, name: &str, values: &BTreeMap<String, TypedValue>) -> Result<()> {
        self.require_group(name)?.put(values, self.storage.as_ref())
    }

    // =========================================================================
    // Links
    // =========================================================================

    pub fn define_link(&self, local: impl Into<ChannelRef>, spec: LinkSpec) -> Result<LinkId> {
        self.links.define_link(local.into(), spec)
    }

    pub fn remove_link(&self, id: &LinkId) -> Result<()> {
        self.links.remove_link(id)
    }

    pub fn link_put(
        &self,
        id: &LinkId,
        path: &str,
        value: impl Into<TypedValue>,
    ) -> Result<Option<PutTicket>> {
        self.links.link_put(id, path, value.into())
    }

    pub fn link_flush(&self, id: &LinkId) -> Result<Option<PutTicket>> {
        self.links.link_flush(id)
    }

    pub fn link_read(&self, id: &LinkId) -> Result<FieldReading> {
        self.links.link_read(id)
    }

    pub fn link_state(&self, id: &LinkId) -> Result<LinkState> {
        self.links.link_state(id)
    }

    pub fn link_ids(&self) -> Vec<LinkId> {
        self.links.link_ids()
    }

    pub fn link_channel_stats(&self, key: &ChannelKey) -> Option<MonitorQueueStats> {
        self.links.channel_stats(key)
    }

    /// Transport callback: connection state of a remote channel changed.
    pub fn connection_changed(&self, key: &ChannelKey, event: ConnectionEvent) -> Result<()> {
        self.links.connection_changed(key, event)
    }

    /// Transport callback: a remote value arrived.
    pub fn remote_value_received(&self, key: &ChannelKey, update: RemoteUpdate) -> Result<u64> {
        self.links.remote_value_received(key, update)
    }

    /// Transport callback: a put finished.
    pub fn put_completed(&self, id: &LinkId, ticket: PutTicket, result: Result<()>) -> Result<()> {
        self.links.put_completed(id, ticket, result)
    }

    /// Deliver queued remote updates on the calling thread.
    pub fn deliver_link_updates(&self) -> usize {
        self.links.deliver_link_updates()
    }

    /// Deliver remote updates on a background thread.
    pub fn start_link_worker(&self) -> Result<()> {
        self.links.start_worker()
    }

    /// Close every link and group subscription. Idempotent.
    pub fn shutdown(&self) {
        if self.links.is_shut_down() {
            return;
        }
        self.links.shutdown();
        let groups: Vec<_> = {
            let mut groups = self.groups.write();
            self.sites.write().clear();
            groups.drain().map(|(_, runtime)| runtime).collect()
        };
        for runtime in groups {
            runtime.close();
        }
        tracing::info!("engine shut down");
    }

    fn require_group(&self, name: &str) -> Result<Arc<GroupRuntime>> {
        self.group(name)
            .ok_or_else(|| FieldLinkError::NotFound(format!("group '{}'", name)))
    }

    fn install_group(&self, groups: &mut HashMap<String, Arc<GroupRuntime>>, group: Group) {
        let runtime = Arc::new(GroupRuntime::new(group));
        {
            let mut sites = self.sites.write();
            for field in runtime.group().fields() {
                sites
                    .entry(field.channel.clone())
                    .or_default()
                    .push(FieldSite {
                        group: runtime.name().to_string(),
                        field: field.name.clone(),
                    });
            }
        }
        tracing::info!(
            "[{}] installed group ({} fields)",
            runtime.name(),
            runtime.group().fields().len()
        );
        groups.insert(runtime.name().to_string(), runtime);
    }

    fn check_group_names(
        &self,
        built: &[Group],
        groups: &HashMap<String, Arc<GroupRuntime>>,
    ) -> Result<()> {
        match built.iter().find(|g| groups.contains_key(g.name())) {
            Some(existing) => Err(FieldLinkError::Configuration(format!(
                "group '{}' is already defined",
                existing.name()
            ))),
            None => Ok(()),
        }
    }

    fn roll_back_links(&self, link_ids: &[LinkId]) {
        for id in link_ids {
            if let Err(e) = self.links.remove_link(id) {
                tracing::warn!("[{}] rollback failed: {}", id, e);
            }
        }
    }

    fn unindex(&self, runtime: &GroupRuntime) {
        let mut sites = self.sites.write();
        for field in runtime.group().fields() {
            if let Some(entries) = sites.get_mut(&field.channel) {
                entries.retain(|s| s.group != runtime.name());
                if entries.is_empty() {
                    sites.remove(&field.channel);
                }
            }
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.shutdown();
    }
}
