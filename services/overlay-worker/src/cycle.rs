//! GFS forecast cycle identity and retrieval URL.

use std::fmt;

use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, Timelike, Utc};

/// GFS runs every 6 hours (00, 06, 12, 18 UTC).
pub const CYCLE_HOURS: u32 = 6;

/// Default NOMADS grib filter endpoint for the 0.25 degree GFS.
pub const NOMADS_GFS_FILTER: &str = "https://nomads.ncep.noaa.gov/cgi-bin/filter_gfs_0p25.pl";

/// One model run, identified by its UTC date and cycle hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CycleId {
    pub date: NaiveDate,
    pub hour: u32,
}

impl CycleId {
    /// Latest cycle expected to be published at `now`.
    ///
    /// Subtracts the publication latency, then floors to the cycle boundary.
    pub fn latest_available(now: DateTime<Utc>, latency: ChronoDuration) -> Self {
        let t = now - latency;
        Self {
            date: t.date_naive(),
            hour: t.hour() / CYCLE_HOURS * CYCLE_HOURS,
        }
    }

    /// Filter URL for mean sea level PRMSL plus 10 m UGRD/VGRD on the
    /// analysis (f000) file, global bounding box.
    pub fn nomads_url(&self, base_url: &str) -> String {
        format!(
            "{base}?file=gfs.t{hour:02}z.pgrb2.0p25.f000\
             &lev_mean_sea_level=on&lev_10_m_above_ground=on\
             &var_PRMSL=on&var_UGRD=on&var_VGRD=on\
             &leftlon=0&rightlon=359.75&toplat=90&bottomlat=-90\
             &dir=%2Fgfs.{date}%2F{hour:02}%2Fatmos",
            base = base_url,
            hour = self.hour,
            date = self.date.format("%Y%m%d"),
        )
    }
}

impl fmt::Display for CycleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}t{:02}z", self.date.format("%Y%m%d"), self.hour)
    }
}
