//! Per-organ specialization records.
//!
//! One agent behaviour, parametrised by data: each record carries the organ's
//! instruction text and the fixed sentence used for normal findings.

use std::borrow::Cow;

use super::organ::Organ;
use crate::constants::report::NO_ABNORMALITY;
use crate::types::capitalize_first;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Specialization {
    /// Label printed in front of the section
    pub label: Cow<'static, str>,
    /// System instruction for the completion call
    pub instruction: Cow<'static, str>,
    /// Deterministic text for empty or no-pathology findings
    pub normal_sentence: Cow<'static, str>,
}

const SHARED_RULES: &str = "\
- Be precise and include every measurement provided
- Use complete sentences; be concise but thorough
- If the findings read \"NP\" (no pathology) or normal, state that no significant abnormality is detected
- Do not include section headers or organ labels, just the report text";

const LIVER: &str = "\
You are a radiologist specializing in hepatic imaging.
Write a professional, concise report section for the liver.

Guidelines:
- Report liver size (span in cm), echotexture and margins
- Describe focal lesions with size, location and characteristics
- Note presence or absence of hepatomegaly and steatosis
- Comment on hepatic vasculature if mentioned";

const GALLBLADDER: &str = "\
You are a radiologist specializing in gallbladder and biliary imaging.
Write a professional, concise report section for the gallbladder and biliary system.

Guidelines:
- Report gallbladder wall thickness (normal < 3 mm)
- Describe stones or polyps with size and number
- Report CBD diameter (normal < 6 mm, < 8 mm post-cholecystectomy)
- Note pericholecystic fluid and intrahepatic biliary dilatation if mentioned";

const PANCREAS: &str = "\
You are a radiologist specializing in pancreatic imaging.
Write a professional, concise report section for the pancreas.

Guidelines:
- Report head, body and tail size if provided, and echotexture
- Report MPD diameter (normal < 3 mm)
- Note masses, cysts, calcifications, atrophy or fatty change
- Mention peripancreatic fluid collections if present";

const SPLEEN: &str = "\
You are a radiologist specializing in splenic imaging.
Write a professional, concise report section for the spleen.

Guidelines:
- Report splenic length in cm (normal < 12-13 cm); note splenomegaly above 13 cm
- Describe echotexture and any focal lesion
- Comment on accessory spleens if visualized";

const KIDNEY: &str = "\
You are a radiologist specializing in renal imaging.
Write a professional, concise report section for the kidneys.

Guidelines:
- Report each kidney separately (normal length 10-12 cm)
- Describe cortical thickness and echogenicity
- Report presence or absence of hydronephrosis
- Describe stones, cysts or masses with size and side
- Note ureteric dilatation or calculi if mentioned";

const AORTA: &str = "\
You are a radiologist specializing in vascular imaging of the abdominal aorta.
Write a professional, concise report section for the aorta.

Guidelines:
- Report aortic calibre in cm; an abdominal diameter above 3 cm is aneurysmal
- Report location (suprarenal, infrarenal) and mural thrombus if present
- Note calcified plaque
- Recommend follow-up when an aneurysm is present";

const OTHER: &str = "\
You are a radiologist writing a report section for the {organ}.
Write a professional, concise description of the findings.

Guidelines:
- Use standard terminology for the {organ}
- A supporting clinical comment may be provided; use it only for context";

impl Specialization {
    /// Record for one of the six fixed organs
    pub fn for_organ(organ: Organ) -> Self {
        let (body, normal) = match organ {
            Organ::Liver => (
                LIVER,
                "The liver is normal in size, outline and echogenicity. No focal dominant intrahepatic mass is seen.",
            ),
            Organ::Gallbladder => (
                GALLBLADDER,
                "The gallbladder is normal. There is no echogenic stone nor gallbladder polyp.",
            ),
            Organ::Pancreas => (PANCREAS, "The pancreas is normal."),
            Organ::Spleen => (SPLEEN, "The spleen is normal."),
            Organ::Kidney => (
                KIDNEY,
                "The kidneys are normal in size and outline. No pelvicalyceal dilation nor focal contour deforming renal mass is seen.",
            ),
            Organ::Aorta => (
                AORTA,
                "The abdominal aorta is normal, with no visible calcified plaque.",
            ),
        };

        Self {
            label: Cow::Borrowed(organ.label()),
            instruction: Cow::Owned(format!("{}\n{}", body, SHARED_RULES)),
            normal_sentence: Cow::Borrowed(normal),
        }
    }

    /// Generic record for an organ outside the fixed set
    pub fn other(name: &str) -> Self {
        let name = name.trim();
        Self {
            label: Cow::Owned(capitalize_first(name)),
            instruction: Cow::Owned(format!(
                "{}\n{}",
                OTHER.replace("{organ}", &name.to_lowercase()),
                SHARED_RULES
            )),
            normal_sentence: Cow::Borrowed(NO_ABNORMALITY),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_fixed_organ_has_distinct_record() {
        let records: Vec<_> = Organ::CANONICAL
            .iter()
            .map(|o| Specialization::for_organ(*o))
            .collect();

        for (organ, record) in Organ::CANONICAL.iter().zip(&records) {
            assert_eq!(record.label, organ.label());
            assert!(record.instruction.contains("section headers"));
        }
        for i in 0..records.len() {
            for j in (i + 1)..records.len() {
                assert_ne!(records[i].normal_sentence, records[j].normal_sentence);
            }
        }
    }

    #[test]
    fn test_other_record() {
        let record = Specialization::other("adrenal");
        assert_eq!(record.label, "Adrenal");
        assert_eq!(record, Specialization::other("  Adrenal "));
        assert!(record.instruction.contains("for the adrenal"));
        assert_eq!(record.normal_sentence, NO_ABNORMALITY);
    }
}
