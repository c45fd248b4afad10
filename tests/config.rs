#![allow(missing_docs)]
//! Host-level tests for JSON configuration loading and validation.

use std::io::Write as _;

use apa102_display::config::{ChainConfig, DisplayConfig};
use apa102_display::panel::Anchor;
use apa102_display::{Error, Result};
use tempfile::NamedTempFile;

fn write_temp(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file must be created");
    file.write_all(contents.as_bytes())
        .expect("temp file must be writable");
    file
}

#[test]
fn empty_document_uses_defaults() -> Result<()> {
    let config = ChainConfig::from_json_str("{}")?;
    assert_eq!(config, ChainConfig::default());
    assert_eq!(config.device, "/dev/spidev0.0");
    assert_eq!(config.speed_hz, 20_000_000);
    assert_eq!(config.pixel_count, 146);
    assert_eq!(config.brightness, 8);
    Ok(())
}

#[test]
fn chain_config_loads_from_file() -> Result<()> {
    let file = write_temp(
        r#"{
            "device": "/dev/spidev1.0",
            "speed_hz": 8000000,
            "pixel_count": 360,
            "brightness": 31
        }"#,
    );
    let config = ChainConfig::load(file.path())?;
    assert_eq!(
        config,
        ChainConfig {
            device: "/dev/spidev1.0".to_owned(),
            speed_hz: 8_000_000,
            pixel_count: 360,
            brightness: 31,
        }
    );
    Ok(())
}

#[test]
fn brightness_is_clamped() -> Result<()> {
    let config = ChainConfig::from_json_str(r#"{ "brightness": 200 }"#)?;
    assert_eq!(config.brightness, 31);
    Ok(())
}

#[test]
fn zero_pixels_is_invalid() {
    assert!(matches!(
        ChainConfig::from_json_str(r#"{ "pixel_count": 0 }"#),
        Err(Error::InvalidConfig(_))
    ));
}

#[test]
fn zero_speed_and_empty_device_are_invalid() {
    assert!(matches!(
        ChainConfig::from_json_str(r#"{ "speed_hz": 0 }"#),
        Err(Error::InvalidConfig(_))
    ));
    assert!(matches!(
        ChainConfig::from_json_str(r#"{ "device": "" }"#),
        Err(Error::InvalidConfig(_))
    ));
}

#[test]
fn malformed_or_unknown_fields_are_format_errors() {
    assert!(matches!(
        ChainConfig::from_json_str("{ pixel_count: 3 }"),
        Err(Error::Config(_))
    ));
    assert!(matches!(
        ChainConfig::from_json_str(r#"{ "pixels": 3 }"#),
        Err(Error::Config(_))
    ));
    assert!(matches!(
        ChainConfig::from_json_str(r#"{ "brightness": -1 }"#),
        Err(Error::Config(_))
    ));
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().expect("temp dir must be created");
    let missing = dir.path().join("absent.json");
    assert!(matches!(ChainConfig::load(missing), Err(Error::Io(_))));
}

#[test]
fn display_config_loads_panels() -> Result<()> {
    let file = write_temp(
        r#"{
            "speed_hz": 10000000,
            "panels": [
                { "name": "1", "anchor": "top_left", "position": { "x": 0, "y": 0 }, "size": { "width": 32, "height": 8 } },
                { "anchor": "bottom_right", "position": { "x": 0, "y": 8 }, "size": { "width": 32, "height": 8 } }
            ]
        }"#,
    );
    let config = DisplayConfig::load(file.path())?;
    assert_eq!(config.panels.len(), 2);
    assert_eq!(config.panels[0].name, "1");
    assert_eq!(config.panels[1].name, "");
    assert_eq!(config.panels[1].anchor, Anchor::BottomRight);

    let chain = config.chain_config();
    assert_eq!(chain.pixel_count, 512);
    assert_eq!(chain.speed_hz, 10_000_000);
    assert_eq!(chain.device, "/dev/spidev0.0");
    assert_eq!(config.layout()?.locate(31, 15)?, 256);
    Ok(())
}

#[test]
fn display_config_needs_panels() {
    assert!(matches!(
        DisplayConfig::from_json_str("{}"),
        Err(Error::InvalidConfig(_))
    ));
    assert!(matches!(
        DisplayConfig::from_json_str(
            r#"{ "panels": [ { "anchor": "top_left", "position": { "x": 0, "y": 0 }, "size": { "width": 0, "height": 8 } } ] }"#
        ),
        Err(Error::InvalidConfig(_))
    ));
    assert!(matches!(
        DisplayConfig::from_json_str(
            r#"{ "panels": [ { "anchor": "sideways", "position": { "x": 0, "y": 0 }, "size": { "width": 1, "height": 1 } } ] }"#
        ),
        Err(Error::Config(_))
    ));
}

#[test]
fn configs_round_trip_through_json() -> Result<()> {
    let config = DisplayConfig::from_json_str(
        r#"{ "brightness": 12, "panels": [ { "name": "m", "anchor": "top_right", "position": { "x": 2, "y": 3 }, "size": { "width": 4, "height": 5 } } ] }"#,
    )?;
    let json = serde_json::to_string(&config)?;
    assert_eq!(DisplayConfig::from_json_str(&json)?, config);
    Ok(())
}
