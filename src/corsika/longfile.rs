//! Parser for the textual `.long` companion file.
//!
//! CORSIKA writes one section per event: a particle-count table, an
//! energy-deposit table, the Gaisser-Hillas fit parameters, and the
//! calorimetric energy. Sections are interleaved with decorative lines the
//! parser skips; only a bad number inside a recognised table is an error.

use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use log::{debug, info};
use regex::Regex;

use super::error::{CorsikaError, Result};
use super::longitudinal::{GaisserHillas, LongProfile};

fn distribution_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"LONGITUDINAL\s+DISTRIBUTION\s+IN\s+(\d+)\s+(VERTICAL|SLANT)")
            .expect("Invalid distribution header pattern")
    })
}

fn deposit_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"LONGITUDINAL\s+ENERGY\s+DEPOSIT\s+IN\s+(\d+)\s+(VERTICAL|SLANT)")
            .expect("Invalid deposit header pattern")
    })
}

fn step_width_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"STEPS\s+OF\s+([0-9.Ee+-]+)\s*G/CM\*\*2")
            .expect("Invalid step width pattern")
    })
}

fn parameters_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"PARAMETERS\s*=\s*(.+)").expect("Invalid parameters pattern"))
}

fn chi2_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"CHI\*\*2/DOF\s*=\s*([0-9.Ee+-]+)").expect("Invalid chi2 pattern")
    })
}

fn calorimetric_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"CALORIMETRIC\s+ENERGY\s*=\s*([0-9.Ee+-]+)\s*G[eE]V")
            .expect("Invalid calorimetric energy pattern")
    })
}

/// Particle-count table columns: depth, gammas, e+, e-, mu+, mu-, hadrons,
/// charged, nuclei, cherenkov. Deposit table columns: depth, gamma, em
/// ionisation, em cut, mu ionisation, mu cut, hadron ionisation, hadron
/// cut, neutrino, sum.
const TABLE_COLUMNS: usize = 10;

#[derive(Debug, Default)]
struct EventSection {
    slant: bool,
    particle_rows: Vec<[f64; TABLE_COLUMNS]>,
    deposit_rows: Vec<[f64; TABLE_COLUMNS]>,
    fit_parameters: Option<[f64; 6]>,
    chi2_dof: f64,
    calorimetric_energy: f64,
}

/// A parsed `.long` profile file.
///
/// The i-th section corresponds to the i-th event of the particle file; no
/// id cross-check exists in the format, so pairing is positional.
#[derive(Debug)]
pub struct LongFile {
    sections: Vec<EventSection>,
    step_width: f64,
}

impl LongFile {
    /// Read and parse a `.long` file. The parser owns its byte source; the
    /// particle file's stream is never touched.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Reading longitudinal profile file: {}", path.display());
        let text = fs::read_to_string(path)?;
        let file = Self::parse(&text)?;
        info!(
            "Longitudinal profile file {}: {} event sections",
            path.display(),
            file.len()
        );
        Ok(file)
    }

    /// Parse the file contents.
    pub fn parse(text: &str) -> Result<Self> {
        let lines: Vec<&str> = text.lines().collect();
        let mut sections: Vec<EventSection> = Vec::new();
        let mut step_width = 0.0;
        let mut i = 0;

        while i < lines.len() {
            let line = lines[i];

            if let Some(caps) = distribution_re().captures(line) {
                let n_bins = parse_count(&caps[1])?;
                let mut section = EventSection {
                    slant: &caps[2] == "SLANT",
                    ..EventSection::default()
                };
                if let Some(dx) = step_width_re().captures(line) {
                    step_width = parse_float(&dx[1])?;
                }
                i += 1;
                section.particle_rows = read_table(&lines, &mut i, n_bins)?;
                sections.push(section);
                continue;
            }

            if let Some(caps) = deposit_re().captures(line) {
                let n_bins = parse_count(&caps[1])?;
                let section = sections.last_mut().ok_or_else(|| {
                    CorsikaError::MalformedLong(
                        "energy deposit table before any particle table".to_string(),
                    )
                })?;
                i += 1;
                section.deposit_rows = read_table(&lines, &mut i, n_bins)?;
                continue;
            }

            if let Some(section) = sections.last_mut() {
                if let Some(caps) = parameters_re().captures(line) {
                    section.fit_parameters = Some(parse_fit_parameters(&caps[1])?);
                } else if let Some(caps) = chi2_re().captures(line) {
                    section.chi2_dof = parse_float(&caps[1])?;
                } else if let Some(caps) = calorimetric_re().captures(line) {
                    section.calorimetric_energy = parse_float(&caps[1])?;
                }
                // Anything else between sections (column headers, the
                // average-deviation line, banners) is skipped.
            }
            i += 1;
        }

        Ok(Self { sections, step_width })
    }

    /// Number of event sections.
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Depth step width, g/cm².
    pub fn step_width(&self) -> f64 {
        self.step_width
    }

    /// Whether the depth axis is slant rather than vertical.
    pub fn is_slant_depth(&self) -> bool {
        self.sections.first().is_some_and(|s| s.slant)
    }

    pub fn has_particle_profile(&self) -> bool {
        self.sections.iter().any(|s| !s.particle_rows.is_empty())
    }

    pub fn has_energy_deposit(&self) -> bool {
        self.sections.iter().any(|s| !s.deposit_rows.is_empty())
    }

    /// Assemble the profile of the i-th event section.
    pub fn profile(&self, index: usize) -> Result<LongProfile> {
        let section = self.sections.get(index).ok_or_else(|| {
            CorsikaError::MalformedLong(format!(
                "profile {} requested but the file has {} sections",
                index,
                self.sections.len()
            ))
        })?;

        let mut profile = LongProfile {
            slant_depth: section.slant,
            calorimetric_energy: section.calorimetric_energy,
            gaisser_hillas: section.fit_parameters.map(|p| GaisserHillas {
                n_max: p[0],
                x0: p[1],
                x_max: p[2],
                a: p[3],
                b: p[4],
                c: p[5],
                chi2_dof: section.chi2_dof,
            }),
            ..LongProfile::default()
        };

        for row in &section.particle_rows {
            profile.depth.push(row[0]);
            profile.gamma_profile.push(row[1]);
            profile.electron_profile.push(row[2] + row[3]);
            profile.muon_profile.push(row[4] + row[5]);
            profile.charge_profile.push(row[7]);
        }
        for row in &section.deposit_rows {
            profile.depth_de.push(row[0]);
            profile.dedx.push(row[9]);
        }
        Ok(profile)
    }
}

/// A table row begins with a numeric character; everything else between a
/// section header and its rows (column captions, blank lines) is skipped.
fn is_data_row(line: &str) -> bool {
    matches!(
        line.trim_start().chars().next(),
        Some('0'..='9' | '-' | '+' | '.')
    )
}

fn read_table(
    lines: &[&str],
    i: &mut usize,
    n_bins: usize,
) -> Result<Vec<[f64; TABLE_COLUMNS]>> {
    let mut rows = Vec::with_capacity(n_bins);
    while rows.len() < n_bins {
        let line = *lines.get(*i).ok_or_else(|| {
            CorsikaError::MalformedLong(format!(
                "table ended after {} of {} rows",
                rows.len(),
                n_bins
            ))
        })?;
        if distribution_re().is_match(line) || deposit_re().is_match(line) {
            return Err(CorsikaError::MalformedLong(format!(
                "next section begins after {} of {} rows",
                rows.len(),
                n_bins
            )));
        }
        if is_data_row(line) {
            rows.push(parse_row(line)?);
        }
        *i += 1;
    }
    Ok(rows)
}

fn parse_row(line: &str) -> Result<[f64; TABLE_COLUMNS]> {
    let mut row = [0.0; TABLE_COLUMNS];
    let mut fields = line.split_whitespace();
    for (column, slot) in row.iter_mut().enumerate() {
        let field = fields.next().ok_or_else(|| {
            CorsikaError::MalformedLong(format!(
                "table row has {} of {} columns: {:?}",
                column, TABLE_COLUMNS, line
            ))
        })?;
        *slot = parse_float(field)?;
    }
    Ok(row)
}

fn parse_fit_parameters(text: &str) -> Result<[f64; 6]> {
    let mut params = [0.0; 6];
    let mut fields = text.split_whitespace();
    for (n, slot) in params.iter_mut().enumerate() {
        let field = fields.next().ok_or_else(|| {
            CorsikaError::MalformedLong(format!(
                "fit line has {} of 6 parameters: {:?}",
                n, text
            ))
        })?;
        *slot = parse_float(field)?;
    }
    Ok(params)
}

fn parse_float(field: &str) -> Result<f64> {
    field
        .parse()
        .map_err(|_| CorsikaError::MalformedLong(format!("not a number: {:?}", field)))
}

fn parse_count(field: &str) -> Result<usize> {
    field
        .parse()
        .map_err(|_| CorsikaError::MalformedLong(format!("not a count: {:?}", field)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
 LONGITUDINAL DISTRIBUTION IN   3 VERTICAL STEPS OF  10. G/CM**2

  DEPTH     GAMMAS   POSITRONS   ELECTRONS    MU+      MU-    HADRONS  CHARGED   NUCLEI  CHERENKOV
    10.   1.000E+02  2.000E+01  3.000E+01  1.000E+00 2.000E+00 5.000E+00 5.500E+01 0.000E+00 0.000E+00
    20.   2.000E+02  4.000E+01  6.000E+01  2.000E+00 3.000E+00 6.000E+00 1.100E+02 0.000E+00 0.000E+00
    30.   1.500E+02  3.000E+01  4.500E+01  3.000E+00 4.000E+00 7.000E+00 8.000E+01 0.000E+00 0.000E+00

 LONGITUDINAL ENERGY DEPOSIT IN   3 VERTICAL STEPS OF  10. G/CM**2

  DEPTH      GAMMA    EM IONIZ    EM CUT    MU IONIZ    MU CUT   HADR IONIZ  HADR CUT  NEUTRINO       SUM
     5.   1.000E+00  2.000E+00  3.000E+00  1.000E-01 2.000E-01 3.000E-01 4.000E-01 0.000E+00  7.000E+00
    15.   2.000E+00  3.000E+00  4.000E+00  2.000E-01 3.000E-01 4.000E-01 5.000E-01 0.000E+00  1.040E+01
    25.   1.000E+00  1.500E+00  2.000E+00  1.000E-01 1.000E-01 2.000E-01 2.000E-01 0.000E+00  5.100E+00

 FIT OF THE HILLAS CURVE
 PARAMETERS         =   1.234E+05  -1.000E+01  3.000E+02  1.000E+00  1.000E-02  1.000E-05
 CHI**2/DOF         =   2.50
 AV. DEVIATION IN % =   1.50
 CALORIMETRIC ENERGY =  9.876E+04 GEV
";

    #[test]
    fn parses_one_section() {
        let file = LongFile::parse(SAMPLE).unwrap();
        assert_eq!(file.len(), 1);
        assert_eq!(file.step_width(), 10.0);
        assert!(!file.is_slant_depth());
        assert!(file.has_particle_profile());
        assert!(file.has_energy_deposit());
    }

    #[test]
    fn assembles_profile_columns() {
        let file = LongFile::parse(SAMPLE).unwrap();
        let profile = file.profile(0).unwrap();
        assert_eq!(profile.depth, vec![10.0, 20.0, 30.0]);
        assert_eq!(profile.gamma_profile[1], 200.0);
        // electrons = e+ + e-, muons = mu+ + mu-
        assert_eq!(profile.electron_profile[0], 50.0);
        assert_eq!(profile.muon_profile[2], 7.0);
        assert_eq!(profile.charge_profile, vec![55.0, 110.0, 80.0]);
        assert_eq!(profile.depth_de, vec![5.0, 15.0, 25.0]);
        assert_eq!(profile.dedx[1], 10.4);
        assert!(!profile.slant_depth);
    }

    #[test]
    fn parses_fit_and_calorimetric_energy() {
        let file = LongFile::parse(SAMPLE).unwrap();
        let profile = file.profile(0).unwrap();
        let gh = profile.gaisser_hillas.unwrap();
        assert_eq!(gh.n_max, 1.234e5);
        assert_eq!(gh.x0, -10.0);
        assert_eq!(gh.x_max, 300.0);
        assert_eq!(gh.chi2_dof, 2.5);
        assert_eq!(profile.calorimetric_energy, 9.876e4);
    }

    #[test]
    fn slant_header_is_recorded() {
        let text = SAMPLE.replace("VERTICAL", "SLANT");
        let file = LongFile::parse(&text).unwrap();
        assert!(file.is_slant_depth());
        assert!(file.profile(0).unwrap().slant_depth);
    }

    #[test]
    fn two_sections_index_positionally() {
        let text = format!("{}\n{}", SAMPLE, SAMPLE.replace("9.876E+04", "1.111E+04"));
        let file = LongFile::parse(&text).unwrap();
        assert_eq!(file.len(), 2);
        assert_eq!(file.profile(0).unwrap().calorimetric_energy, 9.876e4);
        assert_eq!(file.profile(1).unwrap().calorimetric_energy, 1.111e4);
    }

    #[test]
    fn bad_number_in_table_is_malformed() {
        let text = SAMPLE.replace("2.000E+02", "2.000Q+02");
        assert!(matches!(
            LongFile::parse(&text),
            Err(CorsikaError::MalformedLong(_))
        ));
    }

    #[test]
    fn truncated_table_is_malformed() {
        let end = SAMPLE.find("    30.").unwrap();
        assert!(matches!(
            LongFile::parse(&SAMPLE[..end]),
            Err(CorsikaError::MalformedLong(_))
        ));
    }

    #[test]
    fn out_of_range_profile_is_an_error() {
        let file = LongFile::parse(SAMPLE).unwrap();
        assert!(file.profile(1).is_err());
    }
}
