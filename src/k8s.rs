use anyhow::{Context, Result, anyhow, bail};
use chrono::Utc;
use futures::{AsyncBufReadExt, StreamExt};
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, ReplicaSet, StatefulSet};
use k8s_openapi::api::batch::v1::{CronJob, Job};
use k8s_openapi::api::core::v1::{Event, Namespace, Node, Pod, PodStatus};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::api::{DeleteParams, ListParams, LogParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client, Config, Resource, ResourceExt};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};

use crate::connection::ClusterError;
use crate::model::{
    AppKind, ApplicationInfo, ClusterMetrics, EventInfo, NamespaceScope, NodeInfo, NodeMetrics,
    PodInfo, PodMetrics,
};

pub const VALIDATION_TIMEOUT: Duration = Duration::from_secs(5);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const LOG_OPEN_TIMEOUT: Duration = Duration::from_secs(10);
const LOG_BATCH: usize = 64;
const RECENT_EVENT_LIMIT: usize = 20;
const ALERT_EVENT_TYPES: [&str; 3] = ["Warning", "Error", "Failed"];

/// The parsed kubeconfig plus the context to start with.
#[derive(Debug, Clone)]
pub struct KubeSetup {
    kubeconfig: Kubeconfig,
    current: String,
    contexts: Vec<String>,
    default_namespace: String,
}

impl KubeSetup {
    /// Reads the kubeconfig from the usual locations. Missing files and
    /// empty context lists are configuration errors.
    pub fn load(requested: Option<&str>) -> Result<Self> {
        let kubeconfig = Kubeconfig::read()
            .context("no kubeconfig found (set KUBECONFIG or create ~/.kube/config)")?;
        Self::from_kubeconfig(kubeconfig, requested)
    }

    fn from_kubeconfig(kubeconfig: Kubeconfig, requested: Option<&str>) -> Result<Self> {
        let mut contexts = kubeconfig
            .contexts
            .iter()
            .map(|named| named.name.clone())
            .collect::<Vec<_>>();
        contexts.sort();
        contexts.dedup();

        let current = match requested {
            Some(name) if contexts.iter().any(|context| context == name) => name.to_string(),
            Some(name) => bail!("context '{name}' is not defined in kubeconfig"),
            None => kubeconfig
                .current_context
                .clone()
                .filter(|current| contexts.contains(current))
                .or_else(|| contexts.first().cloned())
                .context("kubeconfig defines no contexts")?,
        };

        let default_namespace = kubeconfig
            .contexts
            .iter()
            .find(|named| named.name == current)
            .and_then(|named| named.context.as_ref())
            .and_then(|context| context.namespace.clone())
            .unwrap_or_else(|| "default".to_string());

        Ok(Self {
            kubeconfig,
            current,
            contexts,
            default_namespace,
        })
    }

    pub fn current(&self) -> &str {
        &self.current
    }

    pub fn contexts(&self) -> &[String] {
        &self.contexts
    }

    pub fn default_namespace(&self) -> &str {
        &self.default_namespace
    }
}

/// Client bound to one kubeconfig context.
#[derive(Clone)]
pub struct KubeGateway {
    client: Client,
    context: String,
}

impl KubeGateway {
    pub async fn connect(setup: &KubeSetup, context: &str) -> Result<Self> {
        let options = KubeConfigOptions {
            context: Some(context.to_string()),
            cluster: None,
            user: None,
        };
        let mut config = Config::from_custom_kubeconfig(setup.kubeconfig.clone(), &options)
            .await
            .with_context(|| format!("failed to load configuration for context '{context}'"))?;
        config.connect_timeout = Some(CONNECT_TIMEOUT);

        let client = Client::try_from(config).context("failed to initialize Kubernetes client")?;
        Ok(Self {
            client,
            context: context.to_string(),
        })
    }

    /// Builds a client for `context` and proves it works by listing
    /// namespaces. The namespace list is returned for the picker.
    pub async fn validate(
        setup: &KubeSetup,
        context: &str,
    ) -> std::result::Result<(Self, Vec<String>), ClusterError> {
        let attempt = async {
            let gateway = Self::connect(setup, context).await?;
            let namespaces = gateway.list_namespaces().await?;
            Ok::<_, anyhow::Error>((gateway, namespaces))
        };

        match tokio::time::timeout(VALIDATION_TIMEOUT, attempt).await {
            Ok(Ok(validated)) => Ok(validated),
            Ok(Err(error)) => Err(ClusterError::from_failure(context, compact_error(&error))),
            Err(_) => Err(ClusterError::from_failure(
                context,
                format!("timed out after {}s", VALIDATION_TIMEOUT.as_secs()),
            )),
        }
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub async fn list_namespaces(&self) -> Result<Vec<String>> {
        let namespaces: Api<Namespace> = Api::all(self.client.clone());
        let mut names = namespaces
            .list(&list_params())
            .await
            .context("failed to list namespaces")?
            .into_iter()
            .map(|namespace| namespace.name_any())
            .collect::<Vec<_>>();
        names.sort();
        Ok(names)
    }

    pub async fn list_nodes(&self) -> Result<Vec<NodeInfo>> {
        let nodes: Api<Node> = Api::all(self.client.clone());
        let list = nodes.list(&list_params()).await.context("failed to list nodes")?;
        Ok(list.iter().map(node_info).collect())
    }

    pub async fn list_pods(&self, scope: &NamespaceScope) -> Result<Vec<PodInfo>> {
        let pods: Api<Pod> = scoped_api(&self.client, scope);
        let list = pods.list(&list_params()).await.context("failed to list pods")?;
        Ok(list.iter().map(pod_info).collect())
    }

    pub async fn list_applications(&self, scope: &NamespaceScope) -> Result<Vec<ApplicationInfo>> {
        let params = list_params();
        let deployments: Api<Deployment> = scoped_api(&self.client, scope);
        let daemon_sets: Api<DaemonSet> = scoped_api(&self.client, scope);
        let stateful_sets: Api<StatefulSet> = scoped_api(&self.client, scope);
        let replica_sets: Api<ReplicaSet> = scoped_api(&self.client, scope);
        let jobs: Api<Job> = scoped_api(&self.client, scope);
        let cron_jobs: Api<CronJob> = scoped_api(&self.client, scope);

        let (deployments, daemon_sets, stateful_sets, replica_sets, jobs, cron_jobs) = futures::try_join!(
            async { deployments.list(&params).await.context("failed to get deployments") },
            async { daemon_sets.list(&params).await.context("failed to get daemonsets") },
            async { stateful_sets.list(&params).await.context("failed to get statefulsets") },
            async { replica_sets.list(&params).await.context("failed to get replicasets") },
            async { jobs.list(&params).await.context("failed to get jobs") },
            async { cron_jobs.list(&params).await.context("failed to get cronjobs") },
        )?;

        let mut applications = Vec::new();
        applications.extend(deployments.iter().map(deployment_info));
        applications.extend(daemon_sets.iter().map(daemon_set_info));
        applications.extend(stateful_sets.iter().map(stateful_set_info));
        applications.extend(
            replica_sets
                .iter()
                .filter(|replica_set| !owned_by(*replica_set, "Deployment"))
                .map(replica_set_info),
        );
        applications.extend(
            jobs.iter()
                .filter(|job| !owned_by(*job, "CronJob"))
                .map(job_info),
        );
        applications.extend(cron_jobs.iter().map(cron_job_info));
        Ok(applications)
    }

    /// Events from every namespace seen within the last `minutes`.
    pub async fn list_events(&self, minutes: u32) -> Result<Vec<EventInfo>> {
        let events: Api<Event> = Api::all(self.client.clone());
        let list = events.list(&list_params()).await.context("failed to list events")?;
        let now = Utc::now().timestamp();
        let cutoff = now - i64::from(minutes) * 60;
        Ok(list
            .iter()
            .map(|event| event_info(event, now))
            .filter(|event| event.last_seen >= cutoff)
            .collect())
    }

    pub async fn cluster_metrics(&self) -> Result<ClusterMetrics> {
        let nodes: Api<Node> = Api::all(self.client.clone());
        let pods: Api<Pod> = Api::all(self.client.clone());
        let events: Api<Event> = Api::all(self.client.clone());

        let nodes = nodes.list(&list_params()).await.context("failed to list nodes")?;
        let pods = pods.list(&list_params()).await.context("failed to list pods")?;
        let recent_events = match events.list(&list_params()).await {
            Ok(list) => {
                let now = Utc::now().timestamp();
                recent_alerts(list.iter().map(|event| event_info(event, now)).collect())
            }
            Err(error) => {
                warn!("cluster events unavailable: {error}");
                Vec::new()
            }
        };

        Ok(ClusterMetrics {
            nodes: node_metrics(&nodes.items),
            pods: pod_metrics(&pods.items),
            recent_events,
        })
    }

    /// Follows a pod's log, starting with its last `tail_lines` lines, and
    /// hands lines to `sink` in batches. Stops early once `sink` returns
    /// false.
    pub async fn follow_pod_logs(
        &self,
        namespace: &str,
        pod: &str,
        container: Option<&str>,
        tail_lines: i64,
        mut sink: impl FnMut(Vec<String>) -> bool,
    ) -> Result<()> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let params = LogParams {
            container: container.map(str::to_string),
            follow: true,
            tail_lines: Some(tail_lines),
            timestamps: true,
            ..LogParams::default()
        };

        debug!("opening log stream for {namespace}/{pod}");
        let reader = tokio::time::timeout(LOG_OPEN_TIMEOUT, pods.log_stream(pod, &params))
            .await
            .map_err(|_| {
                anyhow!(
                    "log stream timed out after {}s",
                    LOG_OPEN_TIMEOUT.as_secs()
                )
            })?
            .with_context(|| format!("failed to stream logs for {namespace}/{pod}"))?;

        let mut chunks = std::pin::pin!(reader.lines().ready_chunks(LOG_BATCH));
        while let Some(chunk) = chunks.next().await {
            let mut batch = Vec::with_capacity(chunk.len());
            let mut failure = None;
            for line in chunk {
                match line {
                    Ok(line) => batch.push(line),
                    Err(error) => {
                        failure = Some(error);
                        break;
                    }
                }
            }

            if !batch.is_empty() && !sink(batch) {
                return Ok(());
            }
            if let Some(error) = failure {
                return Err(anyhow::Error::new(error).context("log stream interrupted"));
            }
        }
        Ok(())
    }

    /// The pod manifest as YAML, without `metadata.managedFields`.
    pub async fn pod_manifest(&self, namespace: &str, pod: &str) -> Result<String> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let object = pods
            .get(pod)
            .await
            .with_context(|| format!("failed to get pod {namespace}/{pod}"))?;
        let value = serde_json::to_value(&object).context("failed to encode pod")?;
        serde_yaml::to_string(&strip_managed_fields(value)).context("failed to render pod YAML")
    }

    pub async fn delete_pod(&self, namespace: &str, pod: &str) -> Result<()> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        pods.delete(pod, &DeleteParams::default())
            .await
            .with_context(|| format!("failed to delete pod {namespace}/{pod}"))?;
        Ok(())
    }
}

/// Top error plus at most two causes, one per line.
pub fn compact_error(error: &anyhow::Error) -> String {
    let mut out = Vec::new();
    for (index, cause) in error.chain().enumerate() {
        if index == 0 {
            out.push(cause.to_string());
        } else if index <= 2 {
            out.push(format!("caused by: {cause}"));
        } else {
            break;
        }
    }

    out.join("\n")
}

fn scoped_api<K>(client: &Client, scope: &NamespaceScope) -> Api<K>
where
    K: Resource<Scope = k8s_openapi::NamespaceResourceScope>,
    <K as Resource>::DynamicType: Default,
{
    match scope {
        NamespaceScope::All => Api::all(client.clone()),
        NamespaceScope::Named(namespace) => Api::namespaced(client.clone(), namespace),
    }
}

fn list_params() -> ListParams {
    ListParams::default().limit(500)
}

fn owned_by<K: ResourceExt>(resource: &K, kind: &str) -> bool {
    resource
        .owner_references()
        .iter()
        .any(|owner| owner.kind == kind)
}

fn pod_info(pod: &Pod) -> PodInfo {
    let (ready_containers, total_containers, restarts) =
        pod.status.as_ref().map(pod_readiness).unwrap_or((0, 0, 0));
    let spec = pod.spec.as_ref();

    PodInfo {
        name: pod.name_any(),
        namespace: pod.namespace().unwrap_or_default(),
        status: pod_status(pod),
        ready_containers,
        total_containers,
        restarts,
        age: human_age(pod.metadata.creation_timestamp.as_ref()),
        node: spec
            .and_then(|spec| spec.node_name.clone())
            .unwrap_or_default(),
        ip: pod
            .status
            .as_ref()
            .and_then(|status| status.pod_ip.clone())
            .unwrap_or_default(),
        containers: spec
            .map(|spec| {
                spec.containers
                    .iter()
                    .map(|container| container.name.clone())
                    .collect()
            })
            .unwrap_or_default(),
    }
}

/// `Terminating`, then the first container waiting or terminated reason,
/// then the phase.
fn pod_status(pod: &Pod) -> String {
    if pod.metadata.deletion_timestamp.is_some() {
        return "Terminating".to_string();
    }

    let status = pod.status.as_ref();
    let containers = status
        .and_then(|status| status.container_statuses.as_deref())
        .unwrap_or(&[]);
    for container in containers {
        let Some(state) = container.state.as_ref() else {
            continue;
        };
        if let Some(waiting) = state.waiting.as_ref() {
            return waiting.reason.clone().unwrap_or_default();
        }
        if let Some(terminated) = state.terminated.as_ref() {
            return terminated.reason.clone().unwrap_or_default();
        }
    }

    status
        .and_then(|status| status.phase.clone())
        .unwrap_or_else(|| "Unknown".to_string())
}

fn pod_readiness(status: &PodStatus) -> (usize, usize, i32) {
    let container_statuses = status.container_statuses.as_deref().unwrap_or(&[]);
    let total = container_statuses.len();
    let ready = container_statuses
        .iter()
        .filter(|container| container.ready)
        .count();
    let restarts = container_statuses
        .iter()
        .map(|container| container.restart_count)
        .sum();

    (ready, total, restarts)
}

fn node_info(node: &Node) -> NodeInfo {
    let status = node.status.as_ref();
    let system = status.and_then(|status| status.node_info.as_ref());
    let capacity = status.and_then(|status| status.capacity.as_ref());

    NodeInfo {
        name: node.name_any(),
        ready: node_ready(node).unwrap_or(false),
        roles: node_roles(node),
        age: human_age(node.metadata.creation_timestamp.as_ref()),
        version: system
            .map(|info| info.kubelet_version.clone())
            .unwrap_or_default(),
        os: system
            .map(|info| info.operating_system.clone())
            .unwrap_or_default(),
        architecture: system
            .map(|info| info.architecture.clone())
            .unwrap_or_default(),
        cpu_capacity: capacity
            .and_then(|capacity| capacity.get("cpu"))
            .map(|quantity| quantity.0.clone())
            .unwrap_or_default(),
        memory_capacity: capacity
            .and_then(|capacity| capacity.get("memory"))
            .and_then(|quantity| parse_memory_bytes(&quantity.0))
            .map(format_bytes)
            .unwrap_or_default(),
    }
}

/// `None` when the node reports no Ready condition at all.
fn node_ready(node: &Node) -> Option<bool> {
    node.status
        .as_ref()
        .and_then(|status| status.conditions.as_ref())
        .and_then(|conditions| {
            conditions
                .iter()
                .find(|condition| condition.type_ == "Ready")
        })
        .map(|condition| condition.status == "True")
}

fn node_roles(node: &Node) -> Vec<String> {
    let mut roles = node
        .labels()
        .keys()
        .filter_map(|key| key.strip_prefix("node-role.kubernetes.io/"))
        .map(|role| {
            if role.is_empty() {
                "master".to_string()
            } else {
                role.to_string()
            }
        })
        .collect::<Vec<_>>();

    if roles.is_empty() {
        roles.push("worker".to_string());
    }
    roles.sort();
    roles.dedup();
    roles
}

fn application(
    meta_source: &impl ResourceExt,
    kind: AppKind,
    status: &str,
    replicas: i32,
    ready_replicas: i32,
) -> ApplicationInfo {
    ApplicationInfo {
        name: meta_source.name_any(),
        kind,
        namespace: meta_source.namespace().unwrap_or_default(),
        status: status.to_string(),
        replicas,
        ready_replicas,
        age: human_age(meta_source.meta().creation_timestamp.as_ref()),
    }
}

fn replica_status(ready: i32, desired: i32) -> &'static str {
    if ready == desired {
        "Running"
    } else if ready > 0 {
        "Progressing"
    } else {
        "Pending"
    }
}

fn deployment_info(deployment: &Deployment) -> ApplicationInfo {
    let desired = deployment
        .spec
        .as_ref()
        .and_then(|spec| spec.replicas)
        .unwrap_or(1);
    let status = deployment.status.as_ref();
    let ready = status.and_then(|status| status.ready_replicas).unwrap_or(0);
    let conditions = status
        .and_then(|status| status.conditions.as_deref())
        .unwrap_or(&[]);

    let mut label = "Pending";
    for condition in conditions {
        if condition.type_ == "Progressing" && condition.status == "False" {
            label = "Failed";
            break;
        }
        if condition.type_ == "Available" && condition.status == "True" {
            label = if ready == desired {
                "Running"
            } else {
                "Progressing"
            };
            break;
        }
    }

    application(deployment, AppKind::Deployment, label, desired, ready)
}

fn daemon_set_info(daemon_set: &DaemonSet) -> ApplicationInfo {
    let (desired, ready) = daemon_set
        .status
        .as_ref()
        .map(|status| (status.desired_number_scheduled, status.number_ready))
        .unwrap_or((0, 0));
    application(
        daemon_set,
        AppKind::DaemonSet,
        replica_status(ready, desired),
        desired,
        ready,
    )
}

fn stateful_set_info(stateful_set: &StatefulSet) -> ApplicationInfo {
    let desired = stateful_set
        .spec
        .as_ref()
        .and_then(|spec| spec.replicas)
        .unwrap_or(1);
    let ready = stateful_set
        .status
        .as_ref()
        .and_then(|status| status.ready_replicas)
        .unwrap_or(0);
    application(
        stateful_set,
        AppKind::StatefulSet,
        replica_status(ready, desired),
        desired,
        ready,
    )
}

fn replica_set_info(replica_set: &ReplicaSet) -> ApplicationInfo {
    let desired = replica_set
        .spec
        .as_ref()
        .and_then(|spec| spec.replicas)
        .unwrap_or(1);
    let ready = replica_set
        .status
        .as_ref()
        .and_then(|status| status.ready_replicas)
        .unwrap_or(0);
    application(
        replica_set,
        AppKind::ReplicaSet,
        replica_status(ready, desired),
        desired,
        ready,
    )
}

fn job_info(job: &Job) -> ApplicationInfo {
    let parallelism = job
        .spec
        .as_ref()
        .and_then(|spec| spec.parallelism)
        .unwrap_or(1);
    let status = job.status.as_ref();
    let succeeded = status.and_then(|status| status.succeeded).unwrap_or(0);
    let active = status.and_then(|status| status.active).unwrap_or(0);
    let conditions = status
        .and_then(|status| status.conditions.as_deref())
        .unwrap_or(&[]);

    let finished = conditions.iter().find_map(|condition| {
        match (condition.type_.as_str(), condition.status.as_str()) {
            ("Complete", "True") => Some("Complete"),
            ("Failed", "True") => Some("Failed"),
            _ => None,
        }
    });
    let label = match finished {
        Some(label) => label,
        None if active > 0 => "Running",
        None => "Pending",
    };

    application(job, AppKind::Job, label, parallelism, succeeded)
}

fn cron_job_info(cron_job: &CronJob) -> ApplicationInfo {
    let suspended = cron_job
        .spec
        .as_ref()
        .and_then(|spec| spec.suspend)
        .unwrap_or(false);
    let active = cron_job
        .status
        .as_ref()
        .and_then(|status| status.active.as_ref())
        .is_some_and(|active| !active.is_empty());
    let label = if suspended {
        "Suspended"
    } else if active {
        "Running"
    } else {
        "Ready"
    };

    application(cron_job, AppKind::CronJob, label, 1, 1)
}

fn event_info(event: &Event, now: i64) -> EventInfo {
    let last_seen = event_timestamp_seconds(event);
    EventInfo {
        event_type: event.type_.clone().unwrap_or_default(),
        reason: event.reason.clone().unwrap_or_default(),
        object: format!(
            "{}/{}",
            event.involved_object.kind.as_deref().unwrap_or_default(),
            event.involved_object.name.as_deref().unwrap_or_default()
        ),
        message: event.message.clone().unwrap_or_default(),
        count: event.count.unwrap_or(1),
        namespace: event.namespace().unwrap_or_default(),
        last_seen,
        age: format_elapsed_seconds((now - last_seen).max(0)),
    }
}

/// Last timestamp, then first timestamp, event time, creation; 0 if none.
fn event_timestamp_seconds(event: &Event) -> i64 {
    event
        .last_timestamp
        .as_ref()
        .map(|time| time.0.as_second())
        .or_else(|| {
            event
                .first_timestamp
                .as_ref()
                .map(|time| time.0.as_second())
        })
        .or_else(|| event.event_time.as_ref().map(|time| time.0.as_second()))
        .or_else(|| {
            event
                .metadata
                .creation_timestamp
                .as_ref()
                .map(|time| time.0.as_second())
        })
        .unwrap_or(0)
}

fn recent_alerts(mut events: Vec<EventInfo>) -> Vec<EventInfo> {
    events.retain(|event| ALERT_EVENT_TYPES.contains(&event.event_type.as_str()));
    events.sort_by_key(|event| std::cmp::Reverse(event.last_seen));
    events.truncate(RECENT_EVENT_LIMIT);
    events
}

fn node_metrics(nodes: &[Node]) -> NodeMetrics {
    let mut metrics = NodeMetrics {
        total: nodes.len(),
        ..NodeMetrics::default()
    };

    for node in nodes {
        match node_ready(node) {
            Some(true) => metrics.ready += 1,
            Some(false) => metrics.not_ready += 1,
            None => {}
        }

        let status = node.status.as_ref();
        let capacity = status.and_then(|status| status.capacity.as_ref());
        let allocatable = status.and_then(|status| status.allocatable.as_ref());
        metrics.cpu_capacity_millicores += quantity(capacity, "cpu", parse_cpu_millicores);
        metrics.memory_capacity_bytes += quantity(capacity, "memory", parse_memory_bytes);
        metrics.cpu_allocatable_millicores += quantity(allocatable, "cpu", parse_cpu_millicores);
        metrics.memory_allocatable_bytes += quantity(allocatable, "memory", parse_memory_bytes);
    }

    metrics
}

fn quantity(
    resources: Option<&BTreeMap<String, Quantity>>,
    name: &str,
    parse: fn(&str) -> Option<u64>,
) -> u64 {
    resources
        .and_then(|resources| resources.get(name))
        .and_then(|quantity| parse(&quantity.0))
        .unwrap_or(0)
}

fn pod_metrics(pods: &[Pod]) -> PodMetrics {
    let mut metrics = PodMetrics {
        total: pods.len(),
        ..PodMetrics::default()
    };

    for pod in pods {
        let phase = pod.status.as_ref().and_then(|status| status.phase.as_deref());
        match phase {
            Some("Running") => metrics.running += 1,
            Some("Pending") => metrics.pending += 1,
            Some("Failed") => metrics.failed += 1,
            Some("Succeeded") => metrics.succeeded += 1,
            _ => metrics.unknown += 1,
        }
    }

    metrics
}

fn strip_managed_fields(mut value: Value) -> Value {
    if let Some(metadata) = value.get_mut("metadata").and_then(Value::as_object_mut) {
        metadata.remove("managedFields");
    }
    value
}

pub fn parse_cpu_millicores(value: &str) -> Option<u64> {
    let raw = value.trim();
    if raw.is_empty() {
        return None;
    }

    let (number, multiplier) = if let Some(number) = raw.strip_suffix('m') {
        (number, 1.0)
    } else if let Some(number) = raw.strip_suffix('u') {
        (number, 0.001)
    } else if let Some(number) = raw.strip_suffix('n') {
        (number, 0.000001)
    } else {
        (raw, 1000.0)
    };

    let numeric = number.parse::<f64>().ok()?;
    let millicores = (numeric * multiplier).round();
    if !millicores.is_finite() || millicores < 0.0 {
        return None;
    }
    Some(millicores as u64)
}

pub fn parse_memory_bytes(value: &str) -> Option<u64> {
    const UNITS: [(&str, f64); 12] = [
        ("Ei", 1_152_921_504_606_846_976.0),
        ("Pi", 1_125_899_906_842_624.0),
        ("Ti", 1_099_511_627_776.0),
        ("Gi", 1_073_741_824.0),
        ("Mi", 1_048_576.0),
        ("Ki", 1_024.0),
        ("E", 1_000_000_000_000_000_000.0),
        ("P", 1_000_000_000_000_000.0),
        ("T", 1_000_000_000_000.0),
        ("G", 1_000_000_000.0),
        ("M", 1_000_000.0),
        ("k", 1_000.0),
    ];

    let raw = value.trim();
    if raw.is_empty() {
        return None;
    }

    let (number, multiplier) = UNITS
        .iter()
        .find_map(|(suffix, multiplier)| {
            raw.strip_suffix(suffix)
                .map(|number| (number, *multiplier))
        })
        .unwrap_or((raw, 1.0));

    let bytes = (number.parse::<f64>().ok()? * multiplier).round();
    if !bytes.is_finite() || bytes < 0.0 {
        return None;
    }
    Some(bytes as u64)
}

pub fn format_cpu_millicores(value: u64) -> String {
    if value >= 1_000 {
        let cores = value as f64 / 1_000.0;
        format!("{cores:.2} cores")
    } else {
        format!("{value}m")
    }
}

pub fn format_bytes(value: u64) -> String {
    const UNITS: [(&str, f64); 5] = [
        ("Pi", 1_125_899_906_842_624.0),
        ("Ti", 1_099_511_627_776.0),
        ("Gi", 1_073_741_824.0),
        ("Mi", 1_048_576.0),
        ("Ki", 1_024.0),
    ];
    if value == 0 {
        return "0B".to_string();
    }

    let value_f64 = value as f64;
    for (suffix, unit_size) in UNITS {
        if value_f64 >= unit_size {
            return format!("{:.1}{suffix}", value_f64 / unit_size);
        }
    }
    format!("{value}B")
}

fn human_age(timestamp: Option<&Time>) -> String {
    let Some(timestamp) = timestamp else {
        return "-".to_string();
    };

    let elapsed = Utc::now().timestamp() - timestamp.0.as_second();
    format_elapsed_seconds(elapsed.max(0))
}

fn format_elapsed_seconds(seconds: i64) -> String {
    if seconds >= 86_400 {
        return format!("{}d", seconds / 86_400);
    }

    if seconds >= 3_600 {
        return format!("{}h", seconds / 3_600);
    }

    if seconds >= 60 {
        return format!("{}m", seconds / 60);
    }

    format!("{seconds}s")
}

#[cfg(test)]
mod tests {
    use super::{
        KubeSetup, cron_job_info, deployment_info, event_info, format_bytes,
        format_cpu_millicores, format_elapsed_seconds, job_info, node_info, node_metrics,
        owned_by, parse_cpu_millicores, parse_memory_bytes, pod_info, pod_metrics, recent_alerts,
        strip_managed_fields,
    };
    use crate::model::{AppKind, EventInfo};
    use k8s_openapi::api::apps::v1::{
        Deployment, DeploymentCondition, DeploymentSpec, DeploymentStatus, ReplicaSet,
    };
    use k8s_openapi::api::batch::v1::{
        CronJob, CronJobSpec, Job, JobCondition, JobSpec, JobStatus,
    };
    use k8s_openapi::api::core::v1::{
        Container, ContainerState, ContainerStateTerminated, ContainerStateWaiting,
        ContainerStatus, Event, Node, NodeCondition, NodeStatus, NodeSystemInfo, ObjectReference,
        Pod, PodSpec, PodStatus,
    };
    use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference, Time};
    use k8s_openapi::jiff::Timestamp;
    use kube::config::Kubeconfig;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn meta(name: &str) -> ObjectMeta {
        ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some("default".to_string()),
            ..ObjectMeta::default()
        }
    }

    fn container_status(name: &str, ready: bool, state: ContainerState) -> ContainerStatus {
        ContainerStatus {
            name: name.to_string(),
            ready,
            restart_count: 2,
            state: Some(state),
            ..ContainerStatus::default()
        }
    }

    fn pod(statuses: Vec<ContainerStatus>, phase: &str) -> Pod {
        Pod {
            metadata: meta("web-1"),
            spec: Some(PodSpec {
                node_name: Some("node-a".to_string()),
                containers: vec![
                    Container {
                        name: "app".to_string(),
                        ..Container::default()
                    },
                    Container {
                        name: "sidecar".to_string(),
                        ..Container::default()
                    },
                ],
                ..PodSpec::default()
            }),
            status: Some(PodStatus {
                phase: Some(phase.to_string()),
                pod_ip: Some("10.0.0.7".to_string()),
                container_statuses: Some(statuses),
                ..PodStatus::default()
            }),
        }
    }

    fn time(seconds: i64) -> Time {
        Time(Timestamp::from_second(seconds).unwrap())
    }

    fn resources(cpu: &str, memory: &str) -> BTreeMap<String, Quantity> {
        BTreeMap::from([
            ("cpu".to_string(), Quantity(cpu.to_string())),
            ("memory".to_string(), Quantity(memory.to_string())),
        ])
    }

    fn node(name: &str, ready: Option<&str>, labels: &[&str]) -> Node {
        Node {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                labels: Some(
                    labels
                        .iter()
                        .map(|label| (label.to_string(), String::new()))
                        .collect(),
                ),
                ..ObjectMeta::default()
            },
            spec: None,
            status: Some(NodeStatus {
                conditions: ready.map(|status| {
                    vec![NodeCondition {
                        type_: "Ready".to_string(),
                        status: status.to_string(),
                        ..NodeCondition::default()
                    }]
                }),
                capacity: Some(resources("4", "8Gi")),
                allocatable: Some(resources("3800m", "7Gi")),
                node_info: Some(NodeSystemInfo {
                    kubelet_version: "v1.30.2".to_string(),
                    operating_system: "linux".to_string(),
                    architecture: "arm64".to_string(),
                    ..NodeSystemInfo::default()
                }),
                ..NodeStatus::default()
            }),
        }
    }

    #[test]
    fn pod_rows_carry_readiness_and_containers() {
        let running = ContainerState {
            running: Some(Default::default()),
            ..ContainerState::default()
        };
        let info = pod(
            vec![
                container_status("app", true, running.clone()),
                container_status("sidecar", false, running),
            ],
            "Running",
        );
        let info = pod_info(&info);

        assert_eq!(info.status, "Running");
        assert_eq!(info.ready(), "1/2");
        assert_eq!(info.restarts, 4);
        assert_eq!(info.node, "node-a");
        assert_eq!(info.ip, "10.0.0.7");
        assert_eq!(info.containers, vec!["app", "sidecar"]);
    }

    #[test]
    fn pod_status_prefers_container_reasons() {
        let waiting = ContainerState {
            waiting: Some(ContainerStateWaiting {
                reason: Some("CrashLoopBackOff".to_string()),
                ..ContainerStateWaiting::default()
            }),
            ..ContainerState::default()
        };
        let terminated = ContainerState {
            terminated: Some(ContainerStateTerminated {
                reason: Some("OOMKilled".to_string()),
                ..ContainerStateTerminated::default()
            }),
            ..ContainerState::default()
        };

        let crashing = pod(vec![container_status("app", false, waiting)], "Running");
        assert_eq!(pod_info(&crashing).status, "CrashLoopBackOff");

        let killed = pod(vec![container_status("app", false, terminated)], "Failed");
        assert_eq!(pod_info(&killed).status, "OOMKilled");

        let mut deleting = pod(Vec::new(), "Running");
        deleting.metadata.deletion_timestamp = Some(time(1_700_000_000));
        assert_eq!(pod_info(&deleting).status, "Terminating");
    }

    #[test]
    fn node_rows_resolve_roles_and_capacity() {
        let control = node_info(&node(
            "cp-1",
            Some("True"),
            &["node-role.kubernetes.io/", "node-role.kubernetes.io/etcd"],
        ));
        assert!(control.ready);
        assert_eq!(control.roles, vec!["etcd", "master"]);
        assert_eq!(control.version, "v1.30.2");
        assert_eq!(control.os, "linux");
        assert_eq!(control.architecture, "arm64");
        assert_eq!(control.cpu_capacity, "4");
        assert_eq!(control.memory_capacity, "8.0Gi");

        let worker = node_info(&node("w-1", Some("False"), &[]));
        assert_eq!(worker.status(), "NotReady");
        assert_eq!(worker.roles, vec!["worker"]);
    }

    #[test]
    fn node_metrics_sum_capacity() {
        let nodes = [
            node("a", Some("True"), &[]),
            node("b", Some("False"), &[]),
            node("c", None, &[]),
        ];
        let metrics = node_metrics(&nodes);
        assert_eq!(metrics.total, 3);
        assert_eq!(metrics.ready, 1);
        assert_eq!(metrics.not_ready, 1);
        assert_eq!(metrics.cpu_capacity_millicores, 12_000);
        assert_eq!(metrics.cpu_allocatable_millicores, 11_400);
        assert_eq!(metrics.memory_capacity_bytes, 3 * 8 * 1_073_741_824);
    }

    #[test]
    fn pod_metrics_count_phases() {
        let pods = ["Running", "Running", "Pending", "Failed", "Succeeded", "Weird"]
            .into_iter()
            .map(|phase| pod(Vec::new(), phase))
            .collect::<Vec<_>>();
        let metrics = pod_metrics(&pods);
        assert_eq!(metrics.total, 6);
        assert_eq!(metrics.running, 2);
        assert_eq!(metrics.pending, 1);
        assert_eq!(metrics.failed, 1);
        assert_eq!(metrics.succeeded, 1);
        assert_eq!(metrics.unknown, 1);
    }

    fn deployment(desired: i32, ready: i32, conditions: &[(&str, &str)]) -> Deployment {
        Deployment {
            metadata: meta("api"),
            spec: Some(DeploymentSpec {
                replicas: Some(desired),
                ..DeploymentSpec::default()
            }),
            status: Some(DeploymentStatus {
                ready_replicas: Some(ready),
                conditions: Some(
                    conditions
                        .iter()
                        .map(|(type_, status)| DeploymentCondition {
                            type_: type_.to_string(),
                            status: status.to_string(),
                            ..DeploymentCondition::default()
                        })
                        .collect(),
                ),
                ..DeploymentStatus::default()
            }),
        }
    }

    #[test]
    fn deployment_status_rules() {
        let running = deployment_info(&deployment(3, 3, &[("Available", "True")]));
        assert_eq!(running.status, "Running");
        assert_eq!(running.kind, AppKind::Deployment);
        assert_eq!((running.ready_replicas, running.replicas), (3, 3));

        let rolling = deployment_info(&deployment(3, 1, &[("Available", "True")]));
        assert_eq!(rolling.status, "Progressing");

        let failed = deployment_info(&deployment(
            3,
            3,
            &[("Progressing", "False"), ("Available", "True")],
        ));
        assert_eq!(failed.status, "Failed");

        let pending = deployment_info(&deployment(2, 0, &[]));
        assert_eq!(pending.status, "Pending");
    }

    #[test]
    fn job_and_cron_job_status_rules() {
        let job = |conditions: Vec<JobCondition>, active: i32| Job {
            metadata: meta("migrate"),
            spec: Some(JobSpec {
                parallelism: Some(2),
                ..JobSpec::default()
            }),
            status: Some(JobStatus {
                active: Some(active),
                succeeded: Some(1),
                conditions: Some(conditions),
                ..JobStatus::default()
            }),
        };
        let complete = JobCondition {
            type_: "Complete".to_string(),
            status: "True".to_string(),
            ..JobCondition::default()
        };

        let info = job_info(&job(vec![complete], 0));
        assert_eq!(info.status, "Complete");
        assert_eq!((info.ready_replicas, info.replicas), (1, 2));
        assert_eq!(job_info(&job(Vec::new(), 1)).status, "Running");
        assert_eq!(job_info(&job(Vec::new(), 0)).status, "Pending");

        let cron = |suspend: bool, active: usize| CronJob {
            metadata: meta("nightly"),
            spec: Some(CronJobSpec {
                suspend: Some(suspend),
                ..CronJobSpec::default()
            }),
            status: Some(k8s_openapi::api::batch::v1::CronJobStatus {
                active: Some(vec![ObjectReference::default(); active]),
                ..Default::default()
            }),
        };
        assert_eq!(cron_job_info(&cron(true, 1)).status, "Suspended");
        assert_eq!(cron_job_info(&cron(false, 1)).status, "Running");
        let idle = cron_job_info(&cron(false, 0));
        assert_eq!(idle.status, "Ready");
        assert_eq!((idle.ready_replicas, idle.replicas), (1, 1));
    }

    #[test]
    fn owned_workloads_are_detected() {
        let mut replica_set = ReplicaSet {
            metadata: meta("api-7d9f"),
            ..ReplicaSet::default()
        };
        assert!(!owned_by(&replica_set, "Deployment"));

        replica_set.metadata.owner_references = Some(vec![OwnerReference {
            kind: "Deployment".to_string(),
            name: "api".to_string(),
            ..OwnerReference::default()
        }]);
        assert!(owned_by(&replica_set, "Deployment"));
        assert!(!owned_by(&replica_set, "CronJob"));
    }

    #[test]
    fn event_timestamp_falls_back_in_order() {
        let mut event = Event {
            metadata: meta("api.17a"),
            type_: Some("Warning".to_string()),
            reason: Some("BackOff".to_string()),
            message: Some("Back-off restarting failed container".to_string()),
            count: Some(5),
            ..Event::default()
        };
        event.involved_object.kind = Some("Pod".to_string());
        event.involved_object.name = Some("api-1".to_string());
        event.metadata.creation_timestamp = Some(time(1_000));
        event.first_timestamp = Some(time(2_000));

        let info = event_info(&event, 2_120);
        assert_eq!(info.object, "Pod/api-1");
        assert_eq!(info.count, 5);
        assert_eq!(info.last_seen, 2_000);
        assert_eq!(info.age, "2m");

        event.last_timestamp = Some(time(3_000));
        assert_eq!(event_info(&event, 3_000).last_seen, 3_000);
    }

    #[test]
    fn recent_alerts_keep_twenty_newest_warnings() {
        let events = (0..30)
            .map(|index| EventInfo {
                event_type: if index % 3 == 0 { "Normal" } else { "Warning" }.to_string(),
                last_seen: index,
                ..EventInfo::default()
            })
            .collect::<Vec<_>>();
        let alerts = recent_alerts(events);
        assert_eq!(alerts.len(), 20);
        assert_eq!(alerts[0].last_seen, 29);
        assert!(alerts.iter().all(|event| event.event_type == "Warning"));
    }

    #[test]
    fn managed_fields_are_stripped() {
        let value = json!({
            "metadata": {"name": "web-1", "managedFields": [{"manager": "kubectl"}]},
            "spec": {}
        });
        let stripped = strip_managed_fields(value);
        assert!(stripped["metadata"].get("managedFields").is_none());
        assert_eq!(stripped["metadata"]["name"], "web-1");
    }

    #[test]
    fn quantities_parse_and_format() {
        assert_eq!(parse_cpu_millicores("250m"), Some(250));
        assert_eq!(parse_cpu_millicores("2"), Some(2_000));
        assert_eq!(parse_cpu_millicores("500000n"), Some(1));
        assert_eq!(parse_cpu_millicores(""), None);
        assert_eq!(parse_memory_bytes("1Ki"), Some(1_024));
        assert_eq!(parse_memory_bytes("2G"), Some(2_000_000_000));
        assert_eq!(parse_memory_bytes("123"), Some(123));
        assert_eq!(parse_memory_bytes("lots"), None);
        assert_eq!(format_bytes(0), "0B");
        assert_eq!(format_bytes(1_536), "1.5Ki");
        assert_eq!(format_cpu_millicores(750), "750m");
        assert_eq!(format_cpu_millicores(2_500), "2.50 cores");
    }

    #[test]
    fn elapsed_formatting_uses_largest_unit() {
        assert_eq!(format_elapsed_seconds(5), "5s");
        assert_eq!(format_elapsed_seconds(300), "5m");
        assert_eq!(format_elapsed_seconds(7_200), "2h");
        assert_eq!(format_elapsed_seconds(200_000), "2d");
    }

    const KUBECONFIG: &str = r#"
apiVersion: v1
kind: Config
current-context: staging
clusters:
  - name: c1
    cluster:
      server: https://127.0.0.1:6443
users:
  - name: u1
    user: {}
contexts:
  - name: staging
    context:
      cluster: c1
      user: u1
      namespace: team-a
  - name: prod
    context:
      cluster: c1
      user: u1
"#;

    #[test]
    fn setup_uses_current_context_and_sorts() {
        let kubeconfig: Kubeconfig = serde_yaml::from_str(KUBECONFIG).unwrap();
        let setup = KubeSetup::from_kubeconfig(kubeconfig, None).unwrap();
        assert_eq!(setup.current(), "staging");
        assert_eq!(setup.contexts(), ["prod", "staging"]);
        assert_eq!(setup.default_namespace(), "team-a");
    }

    #[test]
    fn setup_honours_requested_context() {
        let kubeconfig: Kubeconfig = serde_yaml::from_str(KUBECONFIG).unwrap();
        let setup = KubeSetup::from_kubeconfig(kubeconfig.clone(), Some("prod")).unwrap();
        assert_eq!(setup.current(), "prod");
        assert_eq!(setup.default_namespace(), "default");

        assert!(KubeSetup::from_kubeconfig(kubeconfig, Some("missing")).is_err());
    }

    #[test]
    fn setup_without_contexts_is_an_error() {
        let kubeconfig: Kubeconfig =
            serde_yaml::from_str("apiVersion: v1\nkind: Config\n").unwrap();
        let error = KubeSetup::from_kubeconfig(kubeconfig, None).unwrap_err();
        assert!(error.to_string().contains("no contexts"));
    }
}
