use serde::{Deserialize, Serialize};

/// Number of tracked sgpmet variables.
pub const VARIABLE_COUNT: usize = 6;

/// Physical variables extracted from sgpmet files, in the fixed order used for
/// matrix rows, columns and file headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetVariable {
    AtmosPressure,
    TempMean,
    RhMean,
    VaporPressureMean,
    WspdArithMean,
    TbrgPrecipTotalCorr,
}

impl MetVariable {
    pub const ALL: [MetVariable; VARIABLE_COUNT] = [
        MetVariable::AtmosPressure,
        MetVariable::TempMean,
        MetVariable::RhMean,
        MetVariable::VaporPressureMean,
        MetVariable::WspdArithMean,
        MetVariable::TbrgPrecipTotalCorr,
    ];

    /// The five variables correlated when precipitation is left out.
    pub const WITHOUT_PRECIP: [MetVariable; 5] = [
        MetVariable::AtmosPressure,
        MetVariable::TempMean,
        MetVariable::RhMean,
        MetVariable::VaporPressureMean,
        MetVariable::WspdArithMean,
    ];

    /// Position in the fixed variable order.
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Column / variable name in sgpmet files.
    pub fn name(&self) -> &'static str {
        match self {
            MetVariable::AtmosPressure => "atmos_pressure",
            MetVariable::TempMean => "temp_mean",
            MetVariable::RhMean => "rh_mean",
            MetVariable::VaporPressureMean => "vapor_pressure_mean",
            MetVariable::WspdArithMean => "wspd_arith_mean",
            MetVariable::TbrgPrecipTotalCorr => "tbrg_precip_total_corr",
        }
    }

    /// Name of the parallel quality-control column.
    pub fn qc_name(&self) -> &'static str {
        match self {
            MetVariable::AtmosPressure => "qc_atmos_pressure",
            MetVariable::TempMean => "qc_temp_mean",
            MetVariable::RhMean => "qc_rh_mean",
            MetVariable::VaporPressureMean => "qc_vapor_pressure_mean",
            MetVariable::WspdArithMean => "qc_wspd_arith_mean",
            MetVariable::TbrgPrecipTotalCorr => "qc_tbrg_precip_total_corr",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.name() == name.trim())
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            MetVariable::AtmosPressure => "Atmospheric Pressure",
            MetVariable::TempMean => "Temperature (Mean)",
            MetVariable::RhMean => "Relative Humidity (Mean)",
            MetVariable::VaporPressureMean => "Vapor Pressure (Mean)",
            MetVariable::WspdArithMean => "Wind Speed (Mean)",
            MetVariable::TbrgPrecipTotalCorr => "Precipitation (Corrected Total)",
        }
    }

    pub fn units(&self) -> &'static str {
        match self {
            MetVariable::AtmosPressure => "kPa",
            MetVariable::TempMean => "degC",
            MetVariable::RhMean => "%",
            MetVariable::VaporPressureMean => "kPa",
            MetVariable::WspdArithMean => "m/s",
            MetVariable::TbrgPrecipTotalCorr => "mm",
        }
    }

    pub fn is_precipitation(&self) -> bool {
        matches!(self, MetVariable::TbrgPrecipTotalCorr)
    }
}

impl std::fmt::Display for MetVariable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Matrix file header for an ordered list of variables.
pub fn header_for(variables: &[MetVariable]) -> String {
    variables
        .iter()
        .map(|v| v.name())
        .collect::<Vec<_>>()
        .join(", ")
}
