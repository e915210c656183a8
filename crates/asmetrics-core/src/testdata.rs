//! plist fixtures shaped like `powermetrics -f plist` output.

pub(crate) fn cluster_xml(name: &str, freq_hz: f64, idle_ratio: f64, cpus: &[(u32, f64, f64)]) -> String {
    let cores: String = cpus
        .iter()
        .map(|(cpu, freq, idle)| {
            format!(
                "<dict><key>cpu</key><integer>{cpu}</integer>\
                 <key>freq_hz</key><real>{freq}</real>\
                 <key>idle_ratio</key><real>{idle}</real></dict>"
            )
        })
        .collect();
    format!(
        "<dict><key>name</key><string>{name}</string>\
         <key>freq_hz</key><real>{freq_hz}</real>\
         <key>idle_ratio</key><real>{idle_ratio}</real>\
         <key>cpus</key><array>{cores}</array></dict>"
    )
}

pub(crate) fn document(timestamp: Option<&str>, thermal: Option<&str>, clusters: &[String]) -> String {
    let timestamp = timestamp
        .map(|t| format!("<key>timestamp</key><date>{t}</date>"))
        .unwrap_or_default();
    let thermal = thermal
        .map(|t| format!("<key>thermal_pressure</key><string>{t}</string>"))
        .unwrap_or_default();
    let clusters: String = clusters.concat();
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <plist version=\"1.0\">\n\
         <dict>\
         <key>is_delta</key><true/>\
         <key>elapsed_ns</key><integer>1000000000</integer>\
         {timestamp}{thermal}\
         <key>processor</key><dict>\
         <key>clusters</key><array>{clusters}</array>\
         <key>cpu_energy</key><integer>1500</integer>\
         <key>gpu_energy</key><integer>250</integer>\
         <key>ane_energy</key><integer>0</integer>\
         <key>combined_power</key><integer>1750</integer>\
         </dict>\
         <key>gpu</key><dict>\
         <key>freq_hz</key><real>389</real>\
         <key>idle_ratio</key><real>0.75</real>\
         </dict>\
         </dict>\n\
         </plist>\n"
    )
}

/// An M1-shaped document: one E cluster, one P cluster.
pub(crate) fn sample_plist(timestamp: &str, thermal: &str) -> String {
    document(
        Some(timestamp),
        Some(thermal),
        &[
            cluster_xml(
                "E-Cluster",
                1_020_000_000.0,
                0.5,
                &[(0, 1_020_000_000.0, 0.5), (1, 1_020_000_000.0, 0.5)],
            ),
            cluster_xml(
                "P-Cluster",
                3_204_000_000.0,
                0.75,
                &[(2, 3_204_000_000.0, 0.75), (3, 3_204_000_000.0, 0.75)],
            ),
        ],
    )
}

/// The first half of `doc`, as seen mid-write.
pub(crate) fn truncated(doc: &str) -> &str {
    &doc[..doc.len() / 2]
}
