// ── Reactive link store ──
//
// Holds everything a consumer can observe: discovered adapters,
// scanned motion-control systems, pairing groups, the ungrouped pool,
// and the merged motion-control status. All mutation goes through the
// session's apply task; consumers only read snapshots or subscribe.

mod collection;

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::debug;

use crate::model::{LinkAdapter, MotionControlStatus, MotionControlSystem, PairingGroup, NO_GROUP};
use collection::EntityCollection;

/// Shared snapshot vector handed to subscribers.
pub type Snapshot<T> = Arc<Vec<Arc<T>>>;

pub struct LinkStore {
    adapters: EntityCollection<LinkAdapter>,
    systems: EntityCollection<MotionControlSystem>,
    groups: EntityCollection<PairingGroup>,
    ungrouped: EntityCollection<MotionControlSystem>,
    status: watch::Sender<Arc<MotionControlStatus>>,
    last_refresh: watch::Sender<Option<DateTime<Utc>>>,
}

impl LinkStore {
    pub(crate) fn new() -> Self {
        let (status, _) = watch::channel(Arc::new(MotionControlStatus::default()));
        let (last_refresh, _) = watch::channel(None);

        Self {
            adapters: EntityCollection::new(),
            systems: EntityCollection::new(),
            groups: EntityCollection::new(),
            ungrouped: EntityCollection::new(),
            status,
            last_refresh,
        }
    }

    // ── Read side ────────────────────────────────────────────────────

    pub fn adapters(&self) -> Snapshot<LinkAdapter> {
        self.adapters.snapshot()
    }

    pub fn adapter(&self, adapter_id: &str) -> Option<Arc<LinkAdapter>> {
        self.adapters.get(adapter_id)
    }

    pub fn systems(&self) -> Snapshot<MotionControlSystem> {
        self.systems.snapshot()
    }

    pub fn system(&self, mac: &str) -> Option<Arc<MotionControlSystem>> {
        self.systems.get(mac)
    }

    pub fn groups(&self) -> Snapshot<PairingGroup> {
        self.groups.snapshot()
    }

    pub fn group(&self, group_id: u16) -> Option<Arc<PairingGroup>> {
        self.groups.get(&group_id.to_string())
    }

    pub fn ungrouped(&self) -> Snapshot<MotionControlSystem> {
        self.ungrouped.snapshot()
    }

    pub fn status(&self) -> Arc<MotionControlStatus> {
        self.status.borrow().clone()
    }

    pub fn last_refresh(&self) -> Option<DateTime<Utc>> {
        *self.last_refresh.borrow()
    }

    pub fn subscribe_adapters(&self) -> watch::Receiver<Snapshot<LinkAdapter>> {
        self.adapters.subscribe()
    }

    pub fn subscribe_systems(&self) -> watch::Receiver<Snapshot<MotionControlSystem>> {
        self.systems.subscribe()
    }

    pub fn subscribe_groups(&self) -> watch::Receiver<Snapshot<PairingGroup>> {
        self.groups.subscribe()
    }

    pub fn subscribe_ungrouped(&self) -> watch::Receiver<Snapshot<MotionControlSystem>> {
        self.ungrouped.subscribe()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<Arc<MotionControlStatus>> {
        self.status.subscribe()
    }

    // ── Write side (apply task only) ─────────────────────────────────

    /// Admit discovered adapters. Invalid adapters are dropped; known
    /// ones are refreshed. Adapters are never pruned on rescan — an
    /// adapter that stops answering simply goes stale.
    pub(crate) fn admit_adapters(&self, found: Vec<LinkAdapter>) {
        for adapter in found {
            if !adapter.is_valid {
                debug!(adapter = %adapter.link_id, "skipping invalid adapter");
                continue;
            }
            self.adapters.upsert(adapter.link_id.clone(), adapter);
        }
        self.touch();
    }

    /// Apply a full pairing-scan snapshot.
    ///
    /// Systems are reconciled as a set: new macs inserted, stale macs
    /// pruned, survivors refreshed under their existing key. Group
    /// membership follows each system's reported group id.
    pub(crate) fn apply_scan_snapshot(&self, found: Vec<MotionControlSystem>) {
        let incoming_macs: HashSet<String> = found.iter().map(|s| s.mac.clone()).collect();

        for incoming in found {
            if !self.systems.contains(&incoming.mac) {
                self.systems.upsert(incoming.mac.clone(), incoming.clone());
                if !incoming.is_grouped() {
                    self.ungrouped.upsert(incoming.mac.clone(), incoming.clone());
                }
            }
            self.update_group_membership(&incoming);
        }

        for mac in self.systems.keys() {
            if !incoming_macs.contains(&mac) {
                if let Some(removed) = self.systems.remove(&mac) {
                    debug!(mac = %mac, "system dropped out of scan");
                    self.ungrouped.remove(&mac);
                    self.remove_from_group(&removed.mac, removed.group_id);
                }
            }
        }

        self.touch();
    }

    /// Replace the published motion-control status.
    pub(crate) fn publish_status(&self, status: MotionControlStatus) {
        self.status.send_modify(|s| *s = Arc::new(status));
        self.touch();
    }

    /// Drop all scan state and the merged status. Adapters go too;
    /// a reset is followed by a fresh adapter scan.
    pub(crate) fn clear(&self) {
        self.adapters.clear();
        self.systems.clear();
        self.groups.clear();
        self.ungrouped.clear();
        self.status
            .send_modify(|s| *s = Arc::new(MotionControlStatus::default()));
    }

    // ── Group aggregation ────────────────────────────────────────────

    fn update_group_membership(&self, incoming: &MotionControlSystem) {
        let Some(existing) = self.systems.get(&incoming.mac) else {
            return;
        };

        if incoming.is_grouped() {
            self.add_to_group(incoming.group_id, &incoming.mac, &incoming.setup);
        }

        if existing.group_id != incoming.group_id {
            if existing.is_grouped() {
                self.remove_from_group(&existing.mac, existing.group_id);
                // Leaving a group lands the system back in the
                // ungrouped pool, even when it is moving straight
                // into another group.
                self.ungrouped
                    .upsert(incoming.mac.clone(), incoming.clone());
            }
            if incoming.is_grouped() {
                self.add_to_group(incoming.group_id, &incoming.mac, &incoming.setup);
            }
        }

        // Refresh the stored entry under its existing key.
        self.systems.upsert(incoming.mac.clone(), incoming.clone());
    }

    fn add_to_group(&self, group_id: u16, mac: &str, setup: &str) {
        let key = group_id.to_string();
        let mut group = self
            .groups
            .get(&key)
            .map(|g| (*g).clone())
            .unwrap_or_else(|| PairingGroup::new(group_id));
        group.add_member(mac, setup);
        self.groups.upsert(key, group);
    }

    fn remove_from_group(&self, mac: &str, group_id: u16) {
        if group_id == NO_GROUP {
            return;
        }
        let key = group_id.to_string();
        let Some(group) = self.groups.get(&key) else {
            return;
        };
        let mut group = (*group).clone();
        group.remove_member(mac);
        if group.is_empty() {
            self.groups.remove(&key);
        } else {
            self.groups.upsert(key, group);
        }
    }

    fn touch(&self) {
        self.last_refresh.send_modify(|t| *t = Some(Utc::now()));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn adapter(id: &str, valid: bool) -> LinkAdapter {
        serde_json::from_str(&format!(
            r#"{{
                "isDeviceFirmwareUpdateAvailable": false,
                "isDeviceFirmwareUpdateRequired": false,
                "isRadioFirmwareUpdateAvailable": false,
                "isRadioFirmwareUpdateRequired": false,
                "linkConnectionType": "wireless",
                "initialFoundEpoch": 1700000000.0,
                "isPairingDone": false,
                "isValid": {valid},
                "linkID": "{id}",
                "linkType": "linkAdapter",
                "portName": "/dev/ttyUSB0"
            }}"#
        ))
        .unwrap()
    }

    fn system(mac: &str, group_id: u16, setup: &str, rssi: i32) -> MotionControlSystem {
        serde_json::from_str(&format!(
            r#"{{
                "groupId": {group_id},
                "isTilted": 0,
                "mac": "{mac}",
                "rssi": {rssi},
                "isDeviceFirmwareUpdateAvailable": false,
                "isRadioFirmwareUpdateAvailable": false,
                "setup": "{setup}",
                "type": "headPlusPro"
            }}"#
        ))
        .unwrap()
    }

    #[test]
    fn adapters_accumulate_and_are_never_pruned() {
        let store = LinkStore::new();
        store.admit_adapters(vec![adapter("LA-1", true), adapter("LA-2", false)]);
        assert_eq!(store.adapters().len(), 1);

        // A later scan that no longer lists LA-1 does not remove it.
        store.admit_adapters(vec![adapter("LA-3", true)]);
        let ids: Vec<String> = {
            let mut v: Vec<String> = store
                .adapters()
                .iter()
                .map(|a| a.link_id.clone())
                .collect();
            v.sort();
            v
        };
        assert_eq!(ids, vec!["LA-1".to_owned(), "LA-3".to_owned()]);
    }

    #[test]
    fn scan_reconciliation_prunes_and_retains() {
        let store = LinkStore::new();
        store.apply_scan_snapshot(vec![
            system("aa:01", NO_GROUP, "none", -40),
            system("aa:02", NO_GROUP, "none", -50),
            system("aa:03", NO_GROUP, "none", -60),
        ]);
        assert_eq!(store.systems().len(), 3);
        assert_eq!(store.ungrouped().len(), 3);

        // {A,B,C} -> {B,C,D}: A pruned, B/C retained (refreshed), D new.
        store.apply_scan_snapshot(vec![
            system("aa:02", NO_GROUP, "none", -51),
            system("aa:03", NO_GROUP, "none", -61),
            system("aa:04", NO_GROUP, "none", -70),
        ]);
        assert_eq!(store.systems().len(), 3);
        assert!(store.system("aa:01").is_none());
        assert_eq!(store.system("aa:02").unwrap().rssi, -51);
        assert!(store.system("aa:04").is_some());
        assert_eq!(store.ungrouped().len(), 3);
    }

    #[test]
    fn group_forms_with_master_and_dissolves_when_empty() {
        let store = LinkStore::new();
        store.apply_scan_snapshot(vec![
            system("aa:01", 7, "panTilt", -40),
            system("aa:02", 7, "groupMember", -50),
        ]);

        let group = store.group(7).unwrap();
        assert_eq!(group.members.len(), 2);
        assert_eq!(group.master.as_deref(), Some("aa:01"));
        assert!(store.ungrouped().is_empty());

        // Master leaves; no promotion of the remaining member.
        store.apply_scan_snapshot(vec![
            system("aa:01", NO_GROUP, "none", -40),
            system("aa:02", 7, "groupMember", -50),
        ]);
        let group = store.group(7).unwrap();
        assert_eq!(group.members, vec!["aa:02".to_owned()]);
        assert_eq!(group.master, None);
        assert!(store.ungrouped().iter().any(|s| s.mac == "aa:01"));

        // Last member disappears from the scan; the group dissolves.
        store.apply_scan_snapshot(vec![system("aa:01", NO_GROUP, "none", -40)]);
        assert!(store.group(7).is_none());
        assert!(store.system("aa:02").is_none());
    }

    #[test]
    fn regrouping_moves_between_groups() {
        let store = LinkStore::new();
        store.apply_scan_snapshot(vec![
            system("aa:01", 7, "panTilt", -40),
            system("aa:02", 9, "slideOnly", -50),
        ]);
        assert_eq!(store.group(7).unwrap().members, vec!["aa:01".to_owned()]);

        // aa:01 migrates from group 7 to group 9; 7 is now empty.
        store.apply_scan_snapshot(vec![
            system("aa:01", 9, "groupMember", -40),
            system("aa:02", 9, "slideOnly", -50),
        ]);
        assert!(store.group(7).is_none());
        let group = store.group(9).unwrap();
        assert_eq!(group.members.len(), 2);
        assert_eq!(group.master.as_deref(), Some("aa:02"));
        assert_eq!(store.system("aa:01").unwrap().group_id, 9);
        // Leaving a group always passes through the ungrouped pool,
        // even on a direct migration.
        assert!(store.ungrouped().iter().any(|s| s.mac == "aa:01"));
    }

    #[test]
    fn clear_resets_everything() {
        let store = LinkStore::new();
        store.admit_adapters(vec![adapter("LA-1", true)]);
        store.apply_scan_snapshot(vec![system("aa:01", 7, "panTilt", -40)]);
        assert!(store.last_refresh().is_some());

        store.clear();
        assert!(store.adapters().is_empty());
        assert!(store.systems().is_empty());
        assert!(store.groups().is_empty());
        assert!(store.ungrouped().is_empty());
        assert_eq!(*store.status(), MotionControlStatus::default());
    }
}
