// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

use std::path::Path;

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use feed_connectors::{
    Connector, CustomerConfig, DEFAULT_TOPOLOGY_FEED, GlobalConfig, IniDocument, parse_tags,
};

const GLOBAL: &str = r"
[DEFAULT]
VarDir = /var/lib/argo-connectors

[General]
PublishAms = False
WriteAvro = True

[Connection]
Timeout = 180
Retry = 3
SleepRetry = 60

[InputState]
SaveDir = %(VarDir)s/states
Days = 3

[AvroSchemas]
TopologyGroupOfEndpoints = /etc/argo-egi-connectors/schemas/group_endpoints.avsc
TopologyGroupOfGroups = /etc/argo-egi-connectors/schemas/group_groups.avsc

[Output]
TopologyGroupOfEndpoints = group_endpoints_DATE.avro
TopologyGroupOfGroups = group_groups_DATE.avro
";

fn customer_config(jobs: usize,) -> String
{
    let names: Vec<String,> = (0..jobs).map(|i| format!("JOB_Tenant_{i}"),).collect();
    let mut contents = format!(
        "[CUSTOMER_Tenant]\nName = Tenant\nOutputDir = /var/lib/argo-connectors/Tenant\nJobs = {}\n",
        names.join(", ",)
    );
    for (i, name,) in names.iter().enumerate() {
        contents.push_str(&format!(
            "\n[{name}]\nDirname = Job{i}\nProfiles = ARGO_MON\nTopoFetchType = Sites\n\
             TopoSelectGroupOfGroups = Scope: (EGI, Local), Certification: Certified\n"
        ),);
        if i % 4 == 0 {
            contents.push_str(&format!("TopoFeed = https://feed{}.example.org/gocdbpi/\n", i % 8),);
        }
    }
    contents
}

fn benchmark_global_parse(c: &mut Criterion,)
{
    c.bench_function("parse_global_topology", |b| {
        b.iter(|| {
            let document = IniDocument::parse(Path::new("global.conf",), black_box(GLOBAL,),)
                .expect("parse failed",);
            GlobalConfig::builder("global.conf",)
                .connector(Some(Connector::Topology,),)
                .parse_document(&document,)
                .expect("validation failed",)
        },)
    },);
}

fn benchmark_customer_parse(c: &mut Criterion,)
{
    let contents = customer_config(100,);

    c.bench_function("parse_100_jobs", |b| {
        b.iter(|| {
            let document = IniDocument::parse(Path::new("customer.conf",), black_box(&contents,),)
                .expect("parse failed",);
            CustomerConfig::builder("customer.conf",)
                .connector(Some(Connector::Topology,),)
                .parse_document(&document,)
                .expect("validation failed",)
        },)
    },);
}

fn benchmark_tag_parsing(c: &mut Criterion,)
{
    let expression = "Scope: (EGI, Local, FedCloud), Monitored: Y, Production: Y, Certification: Certified";

    c.bench_function("parse_tags", |b| {
        b.iter(|| parse_tags(black_box(expression,),).expect("parse failed",),)
    },);
}

fn benchmark_feed_mapping(c: &mut Criterion,)
{
    let contents = customer_config(100,);
    let document = IniDocument::parse(Path::new("customer.conf",), &contents,).expect("parse failed",);
    let config = CustomerConfig::builder("customer.conf",)
        .connector(Some(Connector::Topology,),)
        .parse_document(&document,)
        .expect("validation failed",);

    c.bench_function("map_feed_jobs_100", |b| {
        b.iter(|| {
            let feeds = config.map_feed_jobs(Connector::Topology, black_box(Some(DEFAULT_TOPOLOGY_FEED,),),);
            black_box(feeds.len(),)
        },)
    },);
}

criterion_group!(
    benches,
    benchmark_global_parse,
    benchmark_customer_parse,
    benchmark_tag_parsing,
    benchmark_feed_mapping
);
criterion_main!(benches);
