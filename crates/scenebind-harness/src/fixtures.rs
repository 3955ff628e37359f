#![forbid(unsafe_code)]

//! Sample view models used by the integration tests.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use scenebind_core::{
    Bindable, BindableEnum, ChangeNotifier, ControlBinderProvider, ObservableConfig,
    ObservableHost, ObservableList, ObservableObject, PropertyError, SceneTree, Value,
};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Stance {
    #[default]
    Idle,
    Guard,
    Charge,
}

impl BindableEnum for Stance {
    const TYPE_NAME: &'static str = "Stance";

    fn variants() -> &'static [Self] {
        &[Stance::Idle, Stance::Guard, Stance::Charge]
    }

    fn name(self) -> &'static str {
        match self {
            Stance::Idle => "Idle",
            Stance::Guard => "Guard",
            Stance::Charge => "Charge",
        }
    }

    fn discriminant(self) -> i64 {
        self as i64
    }
}

/// Nested object; only needs a notifier to take part in paths.
pub struct Weapon {
    notifier: ChangeNotifier,
    name: Mutex<String>,
    damage: Mutex<i64>,
}

impl Weapon {
    #[must_use]
    pub fn new(name: &str, damage: i64) -> Arc<Self> {
        Arc::new(Self {
            notifier: ChangeNotifier::new(),
            name: Mutex::new(name.to_owned()),
            damage: Mutex::new(damage),
        })
    }

    pub fn set_name(&self, name: &str) {
        self.notifier.set_and_notify(&self.name, name.to_owned(), "Name");
    }

    pub fn set_damage(&self, damage: i64) {
        self.notifier.set_and_notify(&self.damage, damage, "Damage");
    }

    #[must_use]
    pub fn damage(&self) -> i64 {
        *lock(&self.damage)
    }
}

impl Bindable for Weapon {
    fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    fn get_property(&self, name: &str) -> Option<Value> {
        match name {
            "Name" => Some(Value::from(lock(&self.name).clone())),
            "Damage" => Some(Value::Int(*lock(&self.damage))),
            _ => None,
        }
    }

    fn set_property(&self, name: &str, value: Value) -> Result<(), PropertyError> {
        match name {
            "Damage" => {
                let damage = value
                    .as_int()
                    .ok_or_else(|| PropertyError::type_mismatch(name, "int"))?;
                self.set_damage(damage);
                Ok(())
            }
            "Name" => Err(PropertyError::read_only(name)),
            _ => Err(PropertyError::unknown(name)),
        }
    }
}

/// Root view model with scalar, nested, list and enum properties.
pub struct Player {
    observable: ObservableObject,
    name: Mutex<String>,
    health: Mutex<i64>,
    alive: Mutex<bool>,
    weapon: Mutex<Option<Arc<Weapon>>>,
    inventory: Mutex<ObservableList<String>>,
    stance: Mutex<Stance>,
}

impl Player {
    #[must_use]
    pub fn new(scene: Arc<dyn SceneTree>, binders: Arc<ControlBinderProvider>) -> Arc<Self> {
        Self::with_config(scene, binders, ObservableConfig::default())
    }

    #[must_use]
    pub fn with_config(
        scene: Arc<dyn SceneTree>,
        binders: Arc<ControlBinderProvider>,
        config: ObservableConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            observable: ObservableObject::with_config(scene, binders, config),
            name: Mutex::new("Ayla".to_owned()),
            health: Mutex::new(100),
            alive: Mutex::new(true),
            weapon: Mutex::new(None),
            inventory: Mutex::new(ObservableList::new()),
            stance: Mutex::new(Stance::Idle),
        })
    }

    pub fn set_name(&self, name: &str) {
        self.observable.set_value(&self.name, name.to_owned(), "Name");
    }

    pub fn set_health(&self, health: i64) {
        self.observable.set_value(&self.health, health, "Health");
    }

    pub fn set_alive(&self, alive: bool) {
        self.observable.set_value(&self.alive, alive, "Alive");
    }

    pub fn set_weapon(&self, weapon: Option<Arc<Weapon>>) {
        self.observable.set_value(&self.weapon, weapon, "Weapon");
    }

    pub fn set_inventory(&self, inventory: ObservableList<String>) {
        self.observable.set_value(&self.inventory, inventory, "Inventory");
    }

    pub fn set_stance(&self, stance: Stance) {
        self.observable.set_value(&self.stance, stance, "Stance");
    }

    #[must_use]
    pub fn name(&self) -> String {
        lock(&self.name).clone()
    }

    #[must_use]
    pub fn health(&self) -> i64 {
        *lock(&self.health)
    }

    #[must_use]
    pub fn alive(&self) -> bool {
        *lock(&self.alive)
    }

    #[must_use]
    pub fn inventory(&self) -> ObservableList<String> {
        lock(&self.inventory).clone()
    }

    #[must_use]
    pub fn stance(&self) -> Stance {
        *lock(&self.stance)
    }
}

impl Bindable for Player {
    fn notifier(&self) -> &ChangeNotifier {
        self.observable.notifier()
    }

    fn get_property(&self, name: &str) -> Option<Value> {
        match name {
            "Name" => Some(Value::from(self.name())),
            "Health" => Some(Value::Int(self.health())),
            "Alive" => Some(Value::Bool(self.alive())),
            "Weapon" => Some(Value::from(lock(&self.weapon).clone())),
            "Inventory" => Some(Value::from(self.inventory())),
            "Stance" => Some(self.stance().to_value()),
            "HasErrors" => Some(Value::Bool(self.observable.has_errors())),
            _ => None,
        }
    }

    fn set_property(&self, name: &str, value: Value) -> Result<(), PropertyError> {
        match name {
            "Name" => {
                let text = value
                    .as_text()
                    .ok_or_else(|| PropertyError::type_mismatch(name, "text"))?;
                self.set_name(text);
            }
            "Health" => {
                let health = value
                    .as_int()
                    .ok_or_else(|| PropertyError::type_mismatch(name, "int"))?;
                self.set_health(health);
            }
            "Alive" => {
                let alive = value
                    .as_bool()
                    .ok_or_else(|| PropertyError::type_mismatch(name, "bool"))?;
                self.set_alive(alive);
            }
            "Stance" => {
                let stance = Stance::from_value(&value)
                    .ok_or_else(|| PropertyError::type_mismatch(name, "Stance"))?;
                self.set_stance(stance);
            }
            "Weapon" | "Inventory" | "HasErrors" => return Err(PropertyError::read_only(name)),
            _ => return Err(PropertyError::unknown(name)),
        }
        Ok(())
    }
}

impl ObservableHost for Player {
    fn observable(&self) -> &ObservableObject {
        &self.observable
    }
}
