//! The `monitor` plugin: resource readings against configured thresholds.

use std::fmt::Write as _;
use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use bosun_system::SystemFacade;

use crate::error::{PluginError, PluginResult};
use crate::plugin::{BotPlugin, PluginHandler, PluginReplyFn, PluginTrigger};

/// Thresholds; defaults mirror the health-loop warning levels.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
struct MonitorConfig {
    cpu_threshold: f64,
    memory_threshold: f64,
    temperature_threshold: f32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            cpu_threshold: 90.0,
            memory_threshold: 80.0,
            temperature_threshold: 85.0,
        }
    }
}

struct Inner {
    system: SystemFacade,
    config: MonitorConfig,
}

/// Resource-threshold monitoring plugin.
pub(crate) struct MonitorPlugin {
    inner: Arc<Inner>,
}

/// Factory registered in the builtin table.
pub(crate) fn build(config: &serde_yaml::Value) -> PluginResult<Arc<dyn BotPlugin>> {
    let config: MonitorConfig = if config.is_null() {
        MonitorConfig::default()
    } else {
        serde_yaml::from_value(config.clone()).map_err(|e| PluginError::Runtime {
            name: "monitor".to_owned(),
            reason: format!("bad plugin config: {e}"),
        })?
    };
    debug!(?config, "monitor plugin configured");
    Ok(Arc::new(MonitorPlugin {
        inner: Arc::new(Inner {
            system: SystemFacade::new(),
            config,
        }),
    }))
}

impl Inner {
    fn render(&self) -> String {
        let load = self.system.load_average();
        let memory = self.system.memory();
        let sensors = self.system.sensors();

        let memory_flag = if memory.percent > self.config.memory_threshold {
            "over threshold"
        } else {
            "ok"
        };

        let mut text = format!(
            "<b>Monitoring</b>\n\n\
             Load average: {:.2} {:.2} {:.2}\n\
             Memory: {} of {} ({:.2}%) — {memory_flag}\n",
            load.one, load.five, load.fifteen, memory.used, memory.total, memory.percent,
        );

        if sensors.is_empty() {
            text.push_str("Sensors: none exposed\n");
        } else {
            for sensor in sensors {
                match sensor.degrees {
                    Some(degrees) => {
                        let flag = if degrees > self.config.temperature_threshold {
                            "over threshold"
                        } else {
                            "ok"
                        };
                        let _ = writeln!(text, "Sensor {}: {degrees:.1}°C — {flag}", sensor.label);
                    },
                    None => {
                        let _ = writeln!(text, "Sensor {}: no reading", sensor.label);
                    },
                }
            }
        }

        let _ = write!(
            text,
            "\nThresholds: cpu {:.0}%, memory {:.0}%, temperature {:.0}°C",
            self.config.cpu_threshold, self.config.memory_threshold, self.config.temperature_threshold,
        );
        text
    }
}

#[async_trait::async_trait]
impl BotPlugin for MonitorPlugin {
    fn name(&self) -> &str {
        "monitor"
    }

    fn handlers(&self) -> Vec<PluginHandler> {
        let inner = Arc::clone(&self.inner);
        let reply: PluginReplyFn = Arc::new(move |_ctx| {
            let inner = Arc::clone(&inner);
            Box::pin(async move { Ok(inner.render()) })
        });

        vec![
            PluginHandler {
                trigger: PluginTrigger::ButtonText("Monitoring".to_owned()),
                description: "Resource readings against thresholds".to_owned(),
                reply: Arc::clone(&reply),
            },
            PluginHandler {
                trigger: PluginTrigger::Command("/monitoring".to_owned()),
                description: "Resource readings against thresholds".to_owned(),
                reply,
            },
        ]
    }
}
