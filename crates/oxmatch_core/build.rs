use std::env;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// OpenFlow 1.3 basic-class field names, indexed by OXM field type.
const FIELD_NAMES: [&str; 40] = [
    "in_port",
    "in_phy_port",
    "metadata",
    "eth_dst",
    "eth_src",
    "eth_type",
    "vlan_vid",
    "vlan_pcp",
    "ip_dscp",
    "ip_ecn",
    "ip_proto",
    "ipv4_src",
    "ipv4_dst",
    "tcp_src",
    "tcp_dst",
    "udp_src",
    "udp_dst",
    "sctp_src",
    "sctp_dst",
    "icmpv4_type",
    "icmpv4_code",
    "arp_op",
    "arp_spa",
    "arp_tpa",
    "arp_sha",
    "arp_tha",
    "ipv6_src",
    "ipv6_dst",
    "ipv6_flabel",
    "icmpv6_type",
    "icmpv6_code",
    "ipv6_nd_target",
    "ipv6_nd_sll",
    "ipv6_nd_tll",
    "mpls_label",
    "mpls_tc",
    "mpls_bos",
    "pbb_isid",
    "tunnel_id",
    "ipv6_exthdr",
];

fn main() {
    let path = Path::new(&env::var("OUT_DIR").unwrap()).join("codegen.rs");
    let mut file = BufWriter::new(File::create(&path).unwrap());
    let mut m: phf_codegen::Map<&'static str> = phf_codegen::Map::new();
    for (id, name) in FIELD_NAMES.iter().enumerate() {
        m.entry(*name, format!("{}u8", id).as_str());
    }

    write!(
        &mut file,
        "pub static FIELD_MAP: phf::Map<&'static str, u8> = {}",
        m.build()
    )
    .unwrap();
    writeln!(&mut file, ";\n").unwrap();
    writeln!(
        &mut file,
        "pub const FIELD_COUNT: usize = {}usize;\n",
        FIELD_NAMES.len()
    )
    .unwrap();
    println!("cargo:rerun-if-changed=build.rs");
}
