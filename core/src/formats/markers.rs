//! Header and marker recognition for the supported text dialects.
//!
//! Every predicate takes a line with surrounding whitespace already
//! stripped and answers whether it opens (or terminates) a section.

const XYZ_HEADER: &str = "X             Y             Z";

/// MININEC pulse geometry table.
pub fn is_mininec_geometry(line: &str) -> bool {
    line.starts_with(XYZ_HEADER) && line.ends_with("END1 END2  NO.")
}

/// MININEC wire table giving the true wire end points.
pub fn is_wire_list(line: &str) -> bool {
    line.starts_with(XYZ_HEADER) && line.ends_with("SEGMENTS")
}

/// NEC2 segmentation data table.
pub fn is_nec_geometry(line: &str) -> bool {
    line.starts_with("No:       X         Y         Z") && line.ends_with("I-     I    I+   No:")
}

pub fn is_sources(line: &str) -> bool {
    line.starts_with("NO. OF SOURCES")
}

pub fn is_loads(line: &str) -> bool {
    line.starts_with("NUMBER OF LOADS")
}

pub fn is_environment(line: &str) -> bool {
    line.starts_with("ENVIRONMENT")
}

pub fn is_data_card(line: &str) -> bool {
    line.starts_with("DATA CARD No:")
}

/// Comma separated gain dump of the BASIC MININEC.
pub fn is_basic_gain(line: &str) -> bool {
    line.ends_with(",D")
}

pub fn is_mininec_gain(line: &str) -> bool {
    line.starts_with("ANGLE") && line.ends_with("(DB)")
}

pub fn is_nec_gain(line: &str) -> bool {
    line.starts_with("DEGREES   DEGREES        DB") && line.ends_with("VOLTS/M   DEGREES")
}

pub fn is_frequency(line: &str) -> bool {
    line.starts_with("FREQUENCY")
}

pub fn is_impedance(line: &str) -> bool {
    line.starts_with("IMPEDANCE =")
}

pub fn is_antenna_input(line: &str) -> bool {
    line.contains("ANTENNA INPUT PARAMETERS")
}

/// Ctrl-Z, the DOS end-of-file byte.
pub fn is_dos_eof(line: &str) -> bool {
    line.starts_with('\x1a')
}

pub fn is_pulse_row(line: &str) -> bool {
    line.starts_with("PULSE")
}

/// Data rows of NEC/MININEC tables begin with a digit.
pub fn starts_numeric(line: &str) -> bool {
    line.chars().next().is_some_and(|c| c.is_ascii_digit())
}

/// EZNEC far field slice header (`Azimuth Pattern ...`/`Elevation Pattern ...`).
pub fn is_eznec_slice(line: &str) -> bool {
    line.contains("Pattern")
}

pub fn is_eznec_frequency(line: &str) -> bool {
    line.starts_with("Frequency")
}

/// EZNEC column header, compared with collapsed whitespace.
pub fn is_eznec_columns(line: &str) -> bool {
    collapse_whitespace(line) == "Deg V dB H dB Tot dB V Pha H Pha"
}

pub fn collapse_whitespace(line: &str) -> String {
    line.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geometry_headers_are_told_apart() {
        let geo = "X             Y             Z             RADIUS        END1 END2  NO.";
        let wire = "X             Y             Z             RADIUS        SEGMENTS";
        assert!(is_mininec_geometry(geo));
        assert!(!is_wire_list(geo));
        assert!(is_wire_list(wire));
        assert!(!is_mininec_geometry(wire));
    }

    #[test]
    fn nec_table_headers() {
        assert!(is_nec_geometry(
            "No:       X         Y         Z      LENGTH     ALPHA      BETA    RADIUS    I-     I    I+   No:"
        ));
        assert!(is_nec_gain(
            "DEGREES   DEGREES        DB       DB       DB       RATIO   DEG.            VOLTS/M   DEGREES      VOLTS/M   DEGREES"
        ));
        assert!(is_mininec_gain("ANGLE     ANGLE      (DB)       (DB)      (DB)"));
    }

    #[test]
    fn basic_dump_and_eof() {
        assert!(is_basic_gain("ZENITH,AZIMUTH,VERTICAL,HORIZONTAL,TOTAL,D"));
        assert!(is_dos_eof("\x1a"));
        assert!(!is_dos_eof("END"));
    }

    #[test]
    fn numeric_row_detection() {
        assert!(starts_numeric("10.00 20.00"));
        assert!(!starts_numeric("-10.00"));
        assert!(!starts_numeric(""));
    }

    #[test]
    fn eznec_column_header_ignores_spacing() {
        assert!(is_eznec_columns("Deg    V dB      H dB      Tot dB    V Pha     H Pha"));
        assert!(!is_eznec_columns("Deg V dB H dB"));
    }
}
