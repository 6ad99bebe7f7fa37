//! Host platform surface
//!
//! Models the pieces of the smart-home host the bridge talks to: the
//! registry of known characteristic and service names, and `Service`
//! objects that hold characteristic values, dispatch get/set requests to
//! registered handlers and accept pushed value updates.

use crate::error::{BridgeError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info};

/// Declares a closed set of host-registry names with string lookup
macro_rules! registry_kinds {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident ($unknown:path) {
            $($variant:ident),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        $vis enum $name {
            $($variant),+
        }

        impl $name {
            /// Every name known to the host registry
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Registry name
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => stringify!($variant)),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = BridgeError;

            fn from_str(name: &str) -> Result<Self> {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|kind| kind.as_str() == name)
                    .ok_or_else(|| $unknown(name))
            }
        }
    };
}

registry_kinds! {
    /// Service kinds the host can construct
    pub enum ServiceKind (BridgeError::unsupported_service) {
        AccessoryInformation,
        AirQualitySensor,
        BatteryService,
        BridgeConfiguration,
        BridgingState,
        CameraControl,
        CameraRTPStreamManagement,
        CarbonDioxideSensor,
        CarbonMonoxideSensor,
        ContactSensor,
        Door,
        Doorbell,
        Fan,
        GarageDoorOpener,
        HumiditySensor,
        LeakSensor,
        LightSensor,
        Lightbulb,
        LockManagement,
        LockMechanism,
        Microphone,
        MotionSensor,
        OccupancySensor,
        Outlet,
        Pairing,
        ProtocolInformation,
        Relay,
        SecuritySystem,
        SmokeSensor,
        Speaker,
        StatefulProgrammableSwitch,
        StatelessProgrammableSwitch,
        Switch,
        TemperatureSensor,
        Thermostat,
        TimeInformation,
        TunneledBTLEAccessoryService,
        Window,
        WindowCovering,
    }
}

registry_kinds! {
    /// Characteristic names known to the host registry
    pub enum CharacteristicKind (BridgeError::unrecognized_characteristic) {
        AccessoryFlags,
        AccessoryIdentifier,
        Active,
        AdministratorOnlyAccess,
        AirParticulateDensity,
        AirParticulateSize,
        AirQuality,
        AudioFeedback,
        BatteryLevel,
        Brightness,
        Category,
        CarbonDioxideDetected,
        CarbonDioxideLevel,
        CarbonDioxidePeakLevel,
        CarbonMonoxideDetected,
        CarbonMonoxideLevel,
        CarbonMonoxidePeakLevel,
        ChargingState,
        ColorTemperature,
        ConfigureBridgedAccessory,
        ConfigureBridgedAccessoryStatus,
        ContactSensorState,
        CoolingThresholdTemperature,
        CurrentAmbientLightLevel,
        CurrentDoorState,
        CurrentHeatingCoolingState,
        CurrentHorizontalTiltAngle,
        CurrentPosition,
        CurrentRelativeHumidity,
        CurrentTemperature,
        CurrentTime,
        CurrentVerticalTiltAngle,
        DayoftheWeek,
        DigitalZoom,
        DiscoverBridgedAccessories,
        DiscoveredBridgedAccessories,
        FirmwareRevision,
        HardwareRevision,
        HeatingThresholdTemperature,
        HoldPosition,
        Hue,
        Identify,
        ImageMirroring,
        ImageRotation,
        LeakDetected,
        LinkQuality,
        LockControlPoint,
        LockCurrentState,
        LockLastKnownAction,
        LockManagementAutoSecurityTimeout,
        LockTargetState,
        Logs,
        Manufacturer,
        Model,
        MotionDetected,
        Mute,
        Name,
        NightVision,
        NitrogenDioxideDensity,
        ObstructionDetected,
        OccupancyDetected,
        On,
        OpticalZoom,
        OutletInUse,
        OzoneDensity,
        PairSetup,
        PairVerify,
        PairingFeatures,
        PairingPairings,
        PM10Density,
        PM2_5Density,
        PositionState,
        ProgrammableSwitchEvent,
        ProgrammableSwitchOutputState,
        Reachable,
        RelayControlPoint,
        RelayEnabled,
        RelayState,
        RotationDirection,
        RotationSpeed,
        Saturation,
        SecuritySystemAlarmType,
        SecuritySystemCurrentState,
        SecuritySystemTargetState,
        SelectedRTPStreamConfiguration,
        SerialNumber,
        SetupEndpoints,
        SmokeDetected,
        SoftwareRevision,
        StatusActive,
        StatusFault,
        StatusJammed,
        StatusLowBattery,
        StatusTampered,
        StreamingStatus,
        SulphurDioxideDensity,
        SupportedAudioStreamConfiguration,
        SupportedRTPConfiguration,
        SupportedVideoStreamConfiguration,
        TargetDoorState,
        TargetHeatingCoolingState,
        TargetHorizontalTiltAngle,
        TargetPosition,
        TargetRelativeHumidity,
        TargetTemperature,
        TargetVerticalTiltAngle,
        TemperatureDisplayUnits,
        TimeUpdate,
        TunnelConnectionTimeout,
        TunneledAccessoryAdvertising,
        TunneledAccessoryConnected,
        TunneledAccessoryStateNumber,
        Version,
        VOCDensity,
        Volume,
        WaterLevel,
    }
}

/// Handler invoked when the host reads or writes a characteristic
#[async_trait]
pub trait CharacteristicHandler: Send + Sync {
    /// Produce the current value
    async fn get(&self) -> Result<Option<f64>>;

    /// Apply a desired value and report the resulting one
    async fn set(&self, desired: Value) -> Result<Option<f64>>;
}

/// Receiver of characteristic values produced outside a get/set request
pub trait CharacteristicSink: Send + Sync {
    /// Push a new value for the named characteristic
    fn push_value(&self, characteristic: &str, value: f64);
}

#[derive(Default)]
struct CharacteristicSlot {
    value: Option<Value>,
    handler: Option<Arc<dyn CharacteristicHandler>>,
}

/// A typed group of characteristics exposed to the host
pub struct Service {
    kind: ServiceKind,
    display_name: String,
    characteristics: RwLock<BTreeMap<CharacteristicKind, CharacteristicSlot>>,
}

impl std::fmt::Debug for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Service")
            .field("kind", &self.kind)
            .field("display_name", &self.display_name)
            .field("characteristics", &self.characteristic_kinds())
            .finish()
    }
}

impl Service {
    /// Construct an empty service
    pub fn new(kind: ServiceKind, display_name: impl Into<String>) -> Self {
        Self {
            kind,
            display_name: display_name.into(),
            characteristics: RwLock::new(BTreeMap::new()),
        }
    }

    /// Accessory information service with static identification fields
    pub fn information(manufacturer: &str, model: &str, serial_number: &str) -> Self {
        let service = Self::new(ServiceKind::AccessoryInformation, "");
        service
            .set_characteristic(CharacteristicKind::Manufacturer, manufacturer)
            .set_characteristic(CharacteristicKind::Model, model)
            .set_characteristic(CharacteristicKind::SerialNumber, serial_number);
        service
    }

    pub fn kind(&self) -> ServiceKind {
        self.kind
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Set a static characteristic value
    pub fn set_characteristic(&self, kind: CharacteristicKind, value: impl Into<Value>) -> &Self {
        self.write_slots()
            .entry(kind)
            .or_default()
            .value = Some(value.into());
        self
    }

    /// Register the get/set handler for a characteristic
    pub fn on_request(&self, kind: CharacteristicKind, handler: Arc<dyn CharacteristicHandler>) {
        self.write_slots().entry(kind).or_default().handler = Some(handler);
    }

    /// Push a value to the host
    pub fn update_value(&self, kind: CharacteristicKind, value: Value) {
        info!(
            service = %self.kind,
            name = %self.display_name,
            characteristic = %kind,
            %value,
            "Characteristic updated"
        );
        self.write_slots().entry(kind).or_default().value = Some(value);
    }

    /// Last known value of a characteristic
    pub fn value(&self, kind: CharacteristicKind) -> Option<Value> {
        self.read_slots().get(&kind).and_then(|slot| slot.value.clone())
    }

    /// Whether a get/set handler is registered
    pub fn has_handler(&self, kind: CharacteristicKind) -> bool {
        self.read_slots()
            .get(&kind)
            .is_some_and(|slot| slot.handler.is_some())
    }

    /// Characteristics present on this service
    pub fn characteristic_kinds(&self) -> Vec<CharacteristicKind> {
        self.read_slots().keys().copied().collect()
    }

    /// Serve a host read request
    pub async fn handle_get(&self, kind: CharacteristicKind) -> Result<Option<Value>> {
        let Some(handler) = self.handler(kind) else {
            return Ok(self.value(kind));
        };

        let value = handler.get().await?.map(number_value);
        if let Some(value) = &value {
            self.store(kind, value.clone());
        }
        Ok(value)
    }

    /// Serve a host write request
    pub async fn handle_set(&self, kind: CharacteristicKind, desired: Value) -> Result<Option<Value>> {
        let handler = self.handler(kind).ok_or_else(|| {
            BridgeError::invalid_input(format!("{kind} on {} is not writable", self.display_name))
        })?;

        let value = handler.set(desired).await?.map(number_value);
        if let Some(value) = &value {
            self.store(kind, value.clone());
        }
        Ok(value)
    }

    fn handler(&self, kind: CharacteristicKind) -> Option<Arc<dyn CharacteristicHandler>> {
        self.read_slots().get(&kind).and_then(|slot| slot.handler.clone())
    }

    fn store(&self, kind: CharacteristicKind, value: Value) {
        self.write_slots().entry(kind).or_default().value = Some(value);
    }

    fn read_slots(
        &self,
    ) -> std::sync::RwLockReadGuard<'_, BTreeMap<CharacteristicKind, CharacteristicSlot>> {
        self.characteristics
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write_slots(
        &self,
    ) -> std::sync::RwLockWriteGuard<'_, BTreeMap<CharacteristicKind, CharacteristicSlot>> {
        self.characteristics
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl CharacteristicSink for Service {
    fn push_value(&self, characteristic: &str, value: f64) {
        match characteristic.parse::<CharacteristicKind>() {
            Ok(kind) => self.update_value(kind, number_value(value)),
            Err(_) => debug!(characteristic, "Ignoring update for unknown characteristic"),
        }
    }
}

/// Render a device reading as a host value
pub fn number_value(value: f64) -> Value {
    serde_json::Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}
