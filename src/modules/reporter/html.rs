use super::models::{CleaningReport, ItemStatus, ReportEntry};
use crate::modules::common::utils;

const STYLE: &str = r#"
        * { margin: 0; padding: 0; box-sizing: border-box; }
        body {
            font-family: "Segoe UI", "Microsoft YaHei", sans-serif;
            background: #eef2f7;
            padding: 24px;
        }
        .container {
            max-width: 1000px;
            margin: 0 auto;
            background: white;
            border-radius: 12px;
            box-shadow: 0 8px 30px rgba(0,0,0,0.12);
            overflow: hidden;
        }
        .header {
            background: linear-gradient(135deg, #0f766e 0%, #115e59 100%);
            color: white;
            padding: 28px 30px;
        }
        .header h1 { font-size: 26px; margin-bottom: 8px; }
        .header .meta { opacity: 0.85; font-size: 14px; line-height: 1.6; }
        .notice {
            margin: 20px 30px 0;
            padding: 12px 16px;
            border-left: 4px solid #f59e0b;
            background: #fffbeb;
            color: #92400e;
            font-size: 14px;
        }
        .summary {
            display: grid;
            grid-template-columns: repeat(auto-fit, minmax(160px, 1fr));
            gap: 16px;
            padding: 24px 30px;
        }
        .stat {
            background: #f8fafc;
            padding: 18px;
            border-radius: 10px;
            text-align: center;
        }
        .stat .value { font-size: 28px; font-weight: bold; color: #0f766e; }
        .stat .label { color: #64748b; margin-top: 6px; font-size: 13px; }
        .stat.failed .value { color: #dc2626; }
        .stat.skipped .value { color: #a16207; }
        .content { padding: 0 30px 30px; }
        .section-title {
            font-size: 17px;
            color: #1e293b;
            margin-bottom: 14px;
            padding-bottom: 8px;
            border-bottom: 2px solid #0f766e;
        }
        table { width: 100%; border-collapse: collapse; }
        th, td {
            padding: 10px 12px;
            text-align: left;
            border-bottom: 1px solid #e2e8f0;
            font-size: 13px;
            vertical-align: top;
        }
        th { background: #f8fafc; color: #1e293b; font-weight: 600; }
        .status {
            display: inline-block;
            padding: 3px 10px;
            border-radius: 12px;
            font-size: 12px;
            font-weight: 600;
            white-space: nowrap;
        }
        .status.deleted { background: #dcfce7; color: #166534; }
        .status.failed { background: #fee2e2; color: #991b1b; }
        .status.skipped { background: #fef9c3; color: #854d0e; }
        .risk { font-size: 12px; color: #475569; }
        .path {
            font-family: "Consolas", monospace;
            color: #64748b;
            word-break: break-all;
        }
        .reason { color: #991b1b; font-size: 12px; margin-top: 4px; }
        .footer {
            background: #f8fafc;
            padding: 16px 30px;
            text-align: center;
            color: #94a3b8;
            font-size: 12px;
        }
"#;

/// 生成 HTML 清理报告
pub fn generate_html_report(report: &CleaningReport) -> String {
    let mut notices = String::new();
    if report.simulated {
        notices.push_str(r#"<div class="notice">本次清理由模拟后端完成，未删除任何真实文件。</div>"#);
    }
    if report.cancelled {
        notices.push_str(r#"<div class="notice">清理被中途取消，未执行的项记为跳过。</div>"#);
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="zh-CN">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>清理报告 - {generated}</title>
    <style>{style}</style>
</head>
<body>
    <div class="container">
        <div class="header">
            <h1>清理报告</h1>
            <div class="meta">
                <p>生成时间: {generated}</p>
                <p>报告ID: {id}</p>
            </div>
        </div>
        {notices}
        <div class="summary">
            <div class="stat">
                <div class="value">{total}</div>
                <div class="label">选中项</div>
            </div>
            <div class="stat">
                <div class="value">{deleted}</div>
                <div class="label">已删除</div>
            </div>
            <div class="stat failed">
                <div class="value">{failed}</div>
                <div class="label">删除失败</div>
            </div>
            <div class="stat skipped">
                <div class="value">{skipped}</div>
                <div class="label">已跳过</div>
            </div>
            <div class="stat">
                <div class="value">{freed}</div>
                <div class="label">释放空间</div>
            </div>
        </div>

        <div class="content">
            {table}
        </div>

        <div class="footer">
            <p>由 rust-qing 清理工具生成</p>
        </div>
    </div>
</body>
</html>"#,
        generated = report.generated_at.format("%Y-%m-%d %H:%M:%S"),
        style = STYLE,
        id = report.id,
        notices = notices,
        total = report.entries.len(),
        deleted = report.deleted_count(),
        failed = report.failed_count(),
        skipped = report.skipped_count(),
        freed = utils::format_size(report.bytes_freed),
        table = generate_entries_table(&report.entries),
    )
}

fn generate_entries_table(entries: &[ReportEntry]) -> String {
    if entries.is_empty() {
        return "<p>没有选中任何项</p>".to_string();
    }

    let mut html = String::from(
        r#"
            <h2 class="section-title">清理详情</h2>
            <table>
                <thead>
                    <tr>
                        <th>状态</th>
                        <th>名称</th>
                        <th>类别</th>
                        <th>路径</th>
                        <th>大小</th>
                    </tr>
                </thead>
                <tbody>
"#,
    );

    for entry in entries {
        let (class, reason) = match &entry.status {
            ItemStatus::Deleted => ("deleted", String::new()),
            ItemStatus::Failed(reason) => (
                "failed",
                format!(r#"<div class="reason">{}</div>"#, escape_html(reason)),
            ),
            ItemStatus::Skipped => ("skipped", String::new()),
        };

        html.push_str(&format!(
            r#"
                    <tr>
                        <td><span class="status {}">{}</span></td>
                        <td>{}<div class="risk">{}</div>{}</td>
                        <td>{}</td>
                        <td class="path">{}</td>
                        <td>{}</td>
                    </tr>
"#,
            class,
            entry.status.label(),
            escape_html(&entry.name),
            entry.risk_level.label(),
            reason,
            entry.category.label(),
            escape_html(&entry.path),
            utils::format_size(entry.size_bytes),
        ));
    }

    html.push_str("</tbody></table>");
    html
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
