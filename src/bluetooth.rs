use crate::error::{Error, Result};
use crate::firmware;
use crate::prelude::App;
use crate::protocol::SensorKind;
use btleplug::api::{
    Central, Characteristic, Manager as _, Peripheral, PeripheralProperties, ScanFilter,
};
use btleplug::platform::Manager;
use futures::stream::StreamExt;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time;
use uuid::Uuid;

/// A raw notification payload, its channel already classified by the GATT
/// service it belongs to. This is all the decoder ever learns about a
/// channel; the payload itself carries no sensor-type field.
#[derive(Clone, Debug)]
pub struct Notification {
    pub kind: SensorKind,
    pub channel: Uuid,
    pub payload: Vec<u8>,
}

#[derive(Clone)]
pub struct Device {
    pub name: String,
    pub address: String,
    peripheral: btleplug::platform::Peripheral,
    telemetry: Vec<(Characteristic, SensorKind)>,
    kind_by_channel: HashMap<Uuid, SensorKind>,
}

fn kind_for_service(service: Uuid) -> Option<SensorKind> {
    let gyro = Uuid::parse_str(firmware::GYRO_SERVICE_UUID).unwrap();
    let accel = Uuid::parse_str(firmware::ACCEL_SERVICE_UUID).unwrap();
    let impact = Uuid::parse_str(firmware::IMPACT_SERVICE_UUID).unwrap();
    if service == gyro {
        Some(SensorKind::Gyro)
    } else if service == accel {
        Some(SensorKind::Accel)
    } else if service == impact {
        Some(SensorKind::Impact)
    } else {
        None
    }
}

impl Device {
    /// Connects, walks the GATT tree and sorts every characteristic into a
    /// sensor kind by its parent service. The user/service channel and
    /// anything unrecognized stay out of the map.
    pub async fn classify_channels(&mut self) -> Result<()> {
        let user = Uuid::parse_str(firmware::USER_SERVICE_UUID).unwrap();
        self.peripheral.connect().await?;
        self.peripheral.discover_services().await?;

        for characteristic in self.peripheral.characteristics() {
            match kind_for_service(characteristic.service_uuid) {
                Some(kind) => {
                    self.kind_by_channel.insert(characteristic.uuid, kind);
                    self.telemetry.push((characteristic, kind));
                }
                None if characteristic.service_uuid == user => {
                    log::debug!("skipping user-service channel {}", characteristic.uuid);
                }
                None => {
                    log::debug!(
                        "skipping channel {} on unknown service {}",
                        characteristic.uuid,
                        characteristic.service_uuid
                    );
                }
            }
        }
        Ok(())
    }

    /// Subscribes to every telemetry channel and forwards notifications into
    /// the session funnel until the peer disconnects or the receiver closes.
    pub async fn stream_notifications(
        &self,
        app: &App,
        tx: mpsc::Sender<Notification>,
    ) -> Result<()> {
        for (characteristic, kind) in &self.telemetry {
            self.peripheral.subscribe(characteristic).await?;
            if app.verbose > 0 {
                println!(
                    "Subscribed to {} channel {}",
                    kind.label(),
                    characteristic.uuid
                );
            }
        }

        let mut notifications = self.peripheral.notifications().await?;
        while let Some(notification) = notifications.next().await {
            let Some(&kind) = self.kind_by_channel.get(&notification.uuid) else {
                // Dropped, logged, not fatal.
                log::warn!("{}", Error::UnknownChannel(notification.uuid));
                continue;
            };
            let out = Notification {
                kind,
                channel: notification.uuid,
                payload: notification.value,
            };
            if tx.send(out).await.is_err() {
                break;
            }
        }
        Ok(())
    }
}

/// Lists nearby adapters and peripherals, pointing out any satellite hub
/// advertising the configured name.
pub async fn scan(app: &App) -> Result<()> {
    println!("Scanning...");

    let manager = Manager::new().await?;
    let adapter_list = manager.adapters().await?;
    if adapter_list.is_empty() {
        eprintln!("No Bluetooth adapters found");
    }

    for adapter in adapter_list.iter() {
        if app.verbose > 0 {
            println!(
                "Trying bluetooth adapter {}...",
                adapter.adapter_info().await?
            );
        }
        adapter.start_scan(ScanFilter::default()).await?;
        time::sleep(Duration::from_secs_f32(app.scantime)).await;

        let peripherals = adapter.peripherals().await?;
        if peripherals.is_empty() {
            eprintln!("No BLE peripheral devices found.");
        } else {
            for peripheral in peripherals.iter() {
                let properties = peripheral.properties().await?;
                if app.verbose > 1 {
                    dbg!(&properties);
                }
                if let Some(PeripheralProperties {
                    address,
                    local_name: Some(name),
                    ..
                }) = &properties
                {
                    if *name == app.device_name {
                        println!("Found satellite hub {name} with address {address}");
                    }
                }
            }
        }
    }
    Ok(())
}

/// Keeps scanning until a peripheral advertising the configured name shows
/// up. The name filter is the only selection criterion; hubs with different
/// firmware identities are handled by pointing it at another name.
pub async fn find_peripheral(app: &App) -> Result<Device> {
    println!("Scanning...");

    let manager = Manager::new().await?;
    let adapter_list = manager.adapters().await?;
    if adapter_list.is_empty() {
        eprintln!("No Bluetooth adapters found");
    }

    loop {
        for adapter in adapter_list.iter() {
            if app.verbose > 0 {
                println!(
                    "Trying bluetooth adapter {}...",
                    adapter.adapter_info().await?
                );
            }
            let _ = adapter.start_scan(ScanFilter::default()).await;
            time::sleep(Duration::from_secs_f32(0.1)).await;

            let peripherals = adapter.peripherals().await?;
            for peripheral in peripherals.iter() {
                let properties = peripheral.properties().await?;
                if app.verbose > 1 {
                    dbg!(&properties);
                }
                if let Some(PeripheralProperties {
                    address,
                    local_name: Some(name),
                    ..
                }) = &properties
                {
                    if *name == app.device_name {
                        println!("Found satellite hub {name} with address {address}");
                        return Ok(Device {
                            name: name.to_string(),
                            address: address.to_string(),
                            peripheral: peripheral.clone(),
                            telemetry: Vec::new(),
                            kind_by_channel: HashMap::new(),
                        });
                    }
                }
            }
        }
    }
}

/// Full transport pipeline: find the hub, classify its channels, pump
/// notifications into the given funnel.
pub async fn capture(app: App, tx: mpsc::Sender<Notification>) -> Result<()> {
    let mut device = find_peripheral(&app).await?;
    device.classify_channels().await?;
    println!("Connected to {} ({})", device.name, device.address);
    device.stream_notifications(&app, tx).await
}
