/// A bidding zone covered by the import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoneSpec {
    /// Area key in the upstream client's naming (`DE_LU`).
    pub query_code: &'static str,
    /// Code written to `generation_ts.bidding_zone` (`DE-LU`).
    pub display_code: &'static str,
    /// ENTSO-E EIC area code sent as `in_Domain`.
    pub eic_code: &'static str,
    /// IANA timezone of the market.
    pub market_tz: &'static str,
}

impl ZoneSpec {
    pub const fn new(
        query_code: &'static str,
        display_code: &'static str,
        eic_code: &'static str,
        market_tz: &'static str,
    ) -> Self {
        Self {
            query_code,
            display_code,
            eic_code,
            market_tz,
        }
    }
}

pub static ZONES: &[ZoneSpec] = &[
    // Core Europe
    ZoneSpec::new("DE_LU", "DE-LU", "10Y1001A1001A82H", "Europe/Berlin"),
    ZoneSpec::new("FR", "FR", "10YFR-RTE------C", "Europe/Paris"),
    ZoneSpec::new("NL", "NL", "10YNL----------L", "Europe/Amsterdam"),
    ZoneSpec::new("BE", "BE", "10YBE----------2", "Europe/Brussels"),
    ZoneSpec::new("AT", "AT", "10YAT-APG------L", "Europe/Vienna"),
    ZoneSpec::new("CH", "CH", "10YCH-SWISSGRIDZ", "Europe/Zurich"),
    ZoneSpec::new("PL", "PL", "10YPL-AREA-----S", "Europe/Warsaw"),
    ZoneSpec::new("CZ", "CZ", "10YCZ-CEPS-----N", "Europe/Prague"),
    ZoneSpec::new("SK", "SK", "10YSK-SEPS-----K", "Europe/Bratislava"),
    ZoneSpec::new("HU", "HU", "10YHU-MAVIR----U", "Europe/Budapest"),
    ZoneSpec::new("SI", "SI", "10YSI-ELES-----O", "Europe/Ljubljana"),
    ZoneSpec::new("HR", "HR", "10YHR-HEP------M", "Europe/Zagreb"),
    // Iberia
    ZoneSpec::new("ES", "ES", "10YES-REE------0", "Europe/Madrid"),
    ZoneSpec::new("PT", "PT", "10YPT-REN------W", "Europe/Lisbon"),
    // Nordics
    ZoneSpec::new("NO_1", "NO1", "10YNO-1--------2", "Europe/Oslo"),
    ZoneSpec::new("NO_2", "NO2", "10YNO-2--------T", "Europe/Oslo"),
    ZoneSpec::new("NO_3", "NO3", "10YNO-3--------J", "Europe/Oslo"),
    ZoneSpec::new("NO_4", "NO4", "10YNO-4--------9", "Europe/Oslo"),
    ZoneSpec::new("NO_5", "NO5", "10Y1001A1001A48H", "Europe/Oslo"),
    ZoneSpec::new("SE_1", "SE1", "10Y1001A1001A44P", "Europe/Stockholm"),
    ZoneSpec::new("SE_2", "SE2", "10Y1001A1001A45N", "Europe/Stockholm"),
    ZoneSpec::new("SE_3", "SE3", "10Y1001A1001A46L", "Europe/Stockholm"),
    ZoneSpec::new("SE_4", "SE4", "10Y1001A1001A47J", "Europe/Stockholm"),
    ZoneSpec::new("FI", "FI", "10YFI-1--------U", "Europe/Helsinki"),
    ZoneSpec::new("DK_1", "DK1", "10YDK-1--------W", "Europe/Copenhagen"),
    ZoneSpec::new("DK_2", "DK2", "10YDK-2--------M", "Europe/Copenhagen"),
    // Baltics
    ZoneSpec::new("EE", "EE", "10Y1001A1001A39I", "Europe/Tallinn"),
    ZoneSpec::new("LV", "LV", "10YLV-1001A00074", "Europe/Riga"),
    ZoneSpec::new("LT", "LT", "10YLT-1001A0008Q", "Europe/Vilnius"),
    // Italy (split zones)
    ZoneSpec::new("IT_NORD", "IT-NORD", "10Y1001A1001A73I", "Europe/Rome"),
    ZoneSpec::new("IT_CNOR", "IT-CNOR", "10Y1001A1001A70O", "Europe/Rome"),
    ZoneSpec::new("IT_CSUD", "IT-CSUD", "10Y1001A1001A71M", "Europe/Rome"),
    ZoneSpec::new("IT_SUD", "IT-SUD", "10Y1001A1001A788", "Europe/Rome"),
    ZoneSpec::new("IT_SICI", "IT-SICI", "10Y1001A1001A75E", "Europe/Rome"),
    ZoneSpec::new("IT_SARD", "IT-SARD", "10Y1001A1001A74G", "Europe/Rome"),
    // Balkans
    ZoneSpec::new("RO", "RO", "10YRO-TEL------P", "Europe/Bucharest"),
    ZoneSpec::new("BG", "BG", "10YCA-BULGARIA-R", "Europe/Sofia"),
    ZoneSpec::new("GR", "GR", "10YGR-HTSO-----Y", "Europe/Athens"),
    ZoneSpec::new("RS", "RS", "10YCS-SERBIATSOV", "Europe/Belgrade"),
    ZoneSpec::new("BA", "BA", "10YBA-JPCC-----D", "Europe/Sarajevo"),
    ZoneSpec::new("ME", "ME", "10YCS-CG-TSO---S", "Europe/Podgorica"),
    ZoneSpec::new("AL", "AL", "10YAL-KESH-----5", "Europe/Tirane"),
    ZoneSpec::new("MK", "MK", "10YMK-MEPSO----8", "Europe/Skopje"),
];

/// Look a zone up by the code stored in `generation_ts` (case-insensitive).
pub fn find_by_display_code(code: &str) -> Option<&'static ZoneSpec> {
    let code = code.trim();
    ZONES
        .iter()
        .find(|z| z.display_code.eq_ignore_ascii_case(code))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::civil_time::CivilTz;
    use std::collections::HashSet;

    #[test]
    fn registry_codes_are_unique() {
        let display: HashSet<_> = ZONES.iter().map(|z| z.display_code).collect();
        let query: HashSet<_> = ZONES.iter().map(|z| z.query_code).collect();
        let eic: HashSet<_> = ZONES.iter().map(|z| z.eic_code).collect();

        assert_eq!(display.len(), ZONES.len());
        assert_eq!(query.len(), ZONES.len());
        assert_eq!(eic.len(), ZONES.len());
    }

    #[test]
    fn every_market_tz_is_known() {
        for zone in ZONES {
            assert!(
                CivilTz::parse(zone.market_tz).is_ok(),
                "unknown tz for {}",
                zone.display_code
            );
        }
    }

    #[test]
    fn eic_codes_have_sixteen_characters() {
        assert!(ZONES.iter().all(|z| z.eic_code.len() == 16));
    }

    #[test]
    fn lookup_by_display_code_ignores_case() {
        let zone = find_by_display_code("it-nord").expect("zone");
        assert_eq!(zone.query_code, "IT_NORD");
        assert!(find_by_display_code("XX").is_none());
    }
}
