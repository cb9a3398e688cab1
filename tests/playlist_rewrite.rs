//! End-to-end playlist rewriting through the public API

use std::net::Ipv4Addr;

use m3u_gateway::config::{ServerConfig, UpstreamConfig};
use m3u_gateway::epg::EpgState;
use m3u_gateway::network::{AddressResolver, InterfaceAddress};
use m3u_gateway::playlist::{ParseSummary, PlaylistRewriter, TransformedPlaylist};
use m3u_gateway::services::{ServiceRegistry, ServiceSource, ServiceType, UrlServiceFactory};

const PLAYLIST: &str = r#"#EXTM3U x-tvg-url="http://epg.example/guide.xml"
#EXTINF:-1 tvg-id="cctv1" group-title="CCTV" catchup="default" catchup-source="rtsp://10.10.0.1/PLTV/1/224/3221225618/index.smil?playseek=${(b)yyyyMMddHHmmss}-${(e)yyyyMMddHHmmss}",CCTV-1
rtp://239.3.1.241:8000
#EXTINF:-1 group-title="CCTV" catchup="append" catchup-source="&playseek={utc:YmdHMS}-{utcend:YmdHMS}",CCTV-2
http://192.168.1.1:4022/udp/239.3.1.242:8001
#EXTINF:-1 group-title="Web",Big Buck Bunny
https://cdn.example/bbb/index.m3u8
#EXTINF:-1 group-title="CCTV",CCTV-1
rtp://239.3.1.249:8000?fcc=10.255.14.152:15970
"#;

struct Gateway {
    buffer: TransformedPlaylist,
    registry: ServiceRegistry,
    factory: UrlServiceFactory,
    epg: EpgState,
    resolver: AddressResolver,
}

impl Gateway {
    fn new(server: ServerConfig, upstream: UpstreamConfig) -> Self {
        let addresses = vec![
            InterfaceAddress::new("wan", Ipv4Addr::new(203, 0, 113, 5)),
            InterfaceAddress::new("lan", Ipv4Addr::new(10, 0, 0, 2)),
        ];
        Self {
            buffer: TransformedPlaylist::new(),
            registry: ServiceRegistry::new(),
            factory: UrlServiceFactory::new(upstream.clone()),
            epg: EpgState::new(),
            resolver: AddressResolver::new(server, upstream, Box::new(addresses)),
        }
    }

    fn rewrite(&mut self, content: &str, source: ServiceSource, token: Option<&str>) -> ParseSummary {
        PlaylistRewriter::new(
            &mut self.buffer,
            &mut self.registry,
            &self.factory,
            &mut self.epg,
            &self.resolver,
            token,
        )
        .rewrite(content, source)
        .expect("rewrite pass")
    }
}

fn upstream_wan() -> UpstreamConfig {
    UpstreamConfig {
        interface: "wan".to_string(),
        ..Default::default()
    }
}

#[test]
fn rewrites_full_playlist() {
    let mut gateway = Gateway::new(ServerConfig::default(), upstream_wan());
    let summary = gateway.rewrite(PLAYLIST, ServiceSource::Inline, None);

    let expected = concat!(
        "#EXTM3U x-tvg-url=\"http://10.0.0.2:5140/epg.xml\"\n",
        "\n",
        "#EXTINF:-1 tvg-id=\"cctv1\" group-title=\"CCTV\" catchup=\"default\" catchup-source=\"http://10.0.0.2:5140/CCTV%2FCCTV-1%2Fcatchup?playseek=${(b)yyyyMMddHHmmss}-${(e)yyyyMMddHHmmss}\",CCTV-1\n",
        "http://10.0.0.2:5140/CCTV%2FCCTV-1\n",
        "\n",
        "#EXTINF:-1 group-title=\"CCTV\" catchup=\"append\" catchup-source=\"?playseek={utc:YmdHMS}-{utcend:YmdHMS}\",CCTV-2\n",
        "http://10.0.0.2:5140/CCTV%2FCCTV-2\n",
        "\n",
        "#EXTINF:-1 group-title=\"Web\",Big Buck Bunny\n",
        "https://cdn.example/bbb/index.m3u8\n",
        "\n",
        "#EXTINF:-1 group-title=\"CCTV\",CCTV-1\n",
        "http://10.0.0.2:5140/CCTV%2FCCTV-1%2F2\n",
        "\n",
    );
    assert_eq!(gateway.buffer.get_current(), Some(expected));

    assert_eq!(summary.entries, 4);
    assert_eq!(summary.rewritten, 3);
    assert_eq!(summary.passed_through, 1);
    assert_eq!(summary.skipped, 0);
    assert_eq!(summary.services_created, 4);

    let names: Vec<&str> = gateway.registry.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["CCTV/CCTV-1", "CCTV/CCTV-1/catchup", "CCTV/CCTV-2", "CCTV/CCTV-1/2"]
    );
    assert_eq!(gateway.epg.url(), Some("http://epg.example/guide.xml"));
}

#[test]
fn services_carry_media_details() {
    let mut gateway = Gateway::new(ServerConfig::default(), upstream_wan());
    gateway.rewrite(PLAYLIST, ServiceSource::External, None);

    let unwrapped = gateway.registry.find("CCTV/CCTV-2").unwrap();
    assert_eq!(unwrapped.url, "udp://239.3.1.242:8001");
    assert_eq!(unwrapped.session.locator.port, 8001);
    assert_eq!(unwrapped.source, ServiceSource::External);

    let catchup = gateway.registry.find("CCTV/CCTV-1/catchup").unwrap();
    assert_eq!(catchup.session.service_type, ServiceType::Rtsp);
    assert_eq!(catchup.session.upstream_interface.as_deref(), Some("wan"));

    let fcc = gateway.registry.find("CCTV/CCTV-1/2").unwrap();
    assert_eq!(fcc.session.fcc_server.as_deref(), Some("10.255.14.152:15970"));
    assert_eq!(fcc.session.fcc_interface.as_deref(), Some("wan"));
}

#[test]
fn hostname_override_and_token() {
    let server = ServerConfig {
        hostname: Some("https://tv.example.com/iptv".to_string()),
        listen: vec!["0.0.0.0:8080".to_string()],
        r2h_token: None,
    };
    let mut gateway = Gateway::new(server, UpstreamConfig::default());
    gateway.rewrite(
        "#EXTM3U url-tvg=\"http://epg.example/e.xml.GZ?k=1\"\n#EXTINF:-1,News\nrtsp://10.0.0.9:554/news?start={utc}&x=1\n",
        ServiceSource::Inline,
        Some("a&b"),
    );

    let output = gateway.buffer.get_current().unwrap();
    assert!(output.starts_with("#EXTM3U x-tvg-url=\"https://tv.example.com/iptv/epg.xml.gz\"\n"));
    assert!(output.contains("\nhttps://tv.example.com/iptv/News?start={utc}&r2h-token=a%26b\n"));
}

#[test]
fn inline_then_external_accumulate_with_single_header() {
    let mut gateway = Gateway::new(ServerConfig::default(), UpstreamConfig::default());
    gateway.rewrite(
        "#EXTM3U\n#EXTINF:-1,Local\nrtp://239.0.0.1:1234\n",
        ServiceSource::Inline,
        None,
    );
    let inline_end = gateway.buffer.inline_end();
    assert_eq!(inline_end, gateway.buffer.len());

    gateway.rewrite(
        "#EXTM3U\n#EXTINF:-1,Remote\nrtp://239.0.0.2:1234\n",
        ServiceSource::External,
        None,
    );
    let output = gateway.buffer.get_current().unwrap();
    assert_eq!(output.matches("#EXTM3U").count(), 1);
    // each pass opens its first entry with a separator
    assert!(output[inline_end..].starts_with("\n#EXTINF:-1,Remote\n"));
    assert_eq!(gateway.buffer.inline_end(), inline_end);

    gateway.buffer.reset_external();
    assert_eq!(gateway.buffer.len(), inline_end);
}
