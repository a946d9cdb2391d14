//! Storefront region profiles.

use serde::Serialize;

use crate::price::CurrencySymbol;

/// Locale, geolocation and currency defaults for one storefront variant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionProfile {
    pub code: &'static str,
    pub base_url: &'static str,
    pub locale: &'static str,
    pub latitude: f64,
    pub longitude: f64,
    pub postcode: &'static str,
    pub default_currency: CurrencySymbol,
}

/// Code of the profile used when a requested region is unknown.
pub const DEFAULT_REGION: &str = "UK";

static REGIONS: [RegionProfile; 6] = [
    // London
    RegionProfile {
        code: "UK",
        base_url: "https://www.ebay.co.uk",
        locale: "en-GB",
        latitude: 51.5074,
        longitude: -0.1278,
        postcode: "SW1A 1AA",
        default_currency: CurrencySymbol::Pound,
    },
    // San Francisco (postcode is New York)
    RegionProfile {
        code: "US",
        base_url: "https://www.ebay.com",
        locale: "en-US",
        latitude: 37.7749,
        longitude: -122.4194,
        postcode: "10001",
        default_currency: CurrencySymbol::Dollar,
    },
    RegionProfile {
        code: "DE",
        base_url: "https://www.ebay.de",
        locale: "de-DE",
        latitude: 52.5200,
        longitude: 13.4050,
        postcode: "10115",
        default_currency: CurrencySymbol::Euro,
    },
    RegionProfile {
        code: "FR",
        base_url: "https://www.ebay.fr",
        locale: "fr-FR",
        latitude: 48.8566,
        longitude: 2.3522,
        postcode: "75001",
        default_currency: CurrencySymbol::Euro,
    },
    RegionProfile {
        code: "AU",
        base_url: "https://www.ebay.com.au",
        locale: "en-AU",
        latitude: -33.8688,
        longitude: 151.2093,
        postcode: "2000",
        default_currency: CurrencySymbol::Dollar,
    },
    RegionProfile {
        code: "CA",
        base_url: "https://www.ebay.ca",
        locale: "en-CA",
        latitude: 43.6532,
        longitude: -79.3832,
        postcode: "M5H 2N2",
        default_currency: CurrencySymbol::Dollar,
    },
];

/// All supported profiles, in display order.
pub fn all() -> &'static [RegionProfile] {
    &REGIONS
}

/// Exact, case-insensitive lookup.
pub fn find(code: &str) -> Option<&'static RegionProfile> {
    let code = code.trim();
    REGIONS.iter().find(|r| r.code.eq_ignore_ascii_case(code))
}

/// The fallback profile.
pub fn default_profile() -> &'static RegionProfile {
    &REGIONS[0]
}

/// Resolve a region code, falling back to [`DEFAULT_REGION`] for unknown codes.
pub fn resolve(code: &str) -> &'static RegionProfile {
    match find(code) {
        Some(profile) => profile,
        None => {
            tracing::warn!(
                "Unknown region '{}', using {} instead",
                code,
                DEFAULT_REGION
            );
            default_profile()
        }
    }
}

impl RegionProfile {
    /// Canonical listing URL for an item id on this storefront.
    pub fn listing_url(&self, listing_id: &str) -> String {
        format!("{}/itm/{}", self.base_url, listing_id.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_code_maps_to_one_profile() {
        for code in ["UK", "US", "DE", "FR", "AU", "CA"] {
            let matches = all().iter().filter(|r| r.code == code).count();
            assert_eq!(matches, 1, "{code}");
            assert_eq!(resolve(code).code, code);
        }
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        assert_eq!(resolve("de").base_url, "https://www.ebay.de");
        assert_eq!(resolve(" au ").locale, "en-AU");
    }

    #[test]
    fn test_unknown_region_falls_back_to_uk() {
        assert!(find("ZZ").is_none());
        let profile = resolve("ZZ");
        assert_eq!(profile.code, "UK");
        assert_eq!(profile.default_currency, CurrencySymbol::Pound);
        assert_eq!(resolve("").code, "UK");
    }

    #[test]
    fn test_listing_url() {
        assert_eq!(
            resolve("US").listing_url("123456789012"),
            "https://www.ebay.com/itm/123456789012"
        );
    }
}
