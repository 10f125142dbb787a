#![no_main]

use figment::providers::{Format, Yaml};
use figment::Figment;
use libfuzzer_sys::fuzz_target;
use modkit_jwt_realm::{JwtRealmSettings, RealmConfig};

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let figment = Figment::new().merge(Yaml::string(s));
        if let Ok(settings) = JwtRealmSettings::from_figment(&figment) {
            let _ = RealmConfig::from_settings(settings);
        }
    }
});
