//! UI route - single HTML page driving the JSON API with vanilla JS

use axum::{
    response::{Html, IntoResponse},
    routing::get,
    Router,
};

use crate::AppState;

pub fn ui_routes() -> Router<AppState> {
    Router::new().route("/", get(root_page))
}

async fn root_page() -> impl IntoResponse {
    Html(ROOT_PAGE)
}

const ROOT_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>GenStudio</title>
    <style>
        body {
            font-family: system-ui, -apple-system, sans-serif;
            max-width: 960px;
            margin: 40px auto;
            padding: 20px;
            line-height: 1.5;
        }
        h1 {
            color: #333;
            border-bottom: 2px solid #0066cc;
            padding-bottom: 10px;
        }
        section {
            border: 1px solid #ddd;
            border-radius: 4px;
            padding: 12px 16px;
            margin-bottom: 16px;
        }
        textarea, input[type=text] {
            width: 100%;
            box-sizing: border-box;
        }
        button {
            padding: 8px 16px;
            background: #0066cc;
            color: white;
            border: none;
            border-radius: 4px;
            cursor: pointer;
        }
        button:hover {
            background: #0052a3;
        }
        pre {
            background: #f5f5f5;
            padding: 10px;
            white-space: pre-wrap;
        }
    </style>
</head>
<body>
    <h1>GenStudio</h1>

    <section>
        <h2>Text</h2>
        <select id="library"></select>
        <textarea id="text-prompt" rows="4" placeholder="Prompt"></textarea>
        <button onclick="generateText()">Generate</button>
    </section>

    <section>
        <h2>Document / Image / Video / Audio</h2>
        <form id="media-form">
            <select name="kind" id="media-kind">
                <option value="pdf">PDF</option>
                <option value="image">Image</option>
                <option value="video">Video</option>
                <option value="audio">Audio</option>
            </select>
            <input type="file" name="file">
            <textarea name="prompt" rows="3" placeholder="Prompt"></textarea>
            <button type="submit">Analyse</button>
        </form>
    </section>

    <section>
        <h2>Spreadsheet rows</h2>
        <form id="rows-form">
            <input type="file" name="file" accept=".xlsx,.xls">
            <input type="text" name="input_column_name" placeholder="Input column name">
            <textarea name="prompt_template" rows="3" placeholder="Prompt template"></textarea>
            <button type="submit">Process rows</button>
        </form>
    </section>

    <section>
        <h2>Story prompts</h2>
        <form id="story-form">
            <input type="file" name="file" accept=".xlsx,.xls">
            <button type="submit">Generate prompts</button>
        </form>
    </section>

    <section>
        <h2>Images</h2>
        <input type="text" id="image-prompt" placeholder="Describe the image">
        <input type="number" id="image-count" min="1" max="12" value="1">
        <button onclick="generateImages()">Generate</button>
    </section>

    <h2>Output</h2>
    <pre id="output">Ready.</pre>

    <script>
        const output = document.getElementById('output');
        const show = (value) => {
            output.textContent = typeof value === 'string' ? value : JSON.stringify(value, null, 2);
        };

        async function send(url, options) {
            const response = await fetch(url, options);
            const body = await response.json();
            if (!response.ok) {
                show(body.error ? body.error.message : body);
                return null;
            }
            return body;
        }

        async function watch(accepted) {
            if (!accepted) return;
            show(`Job ${accepted.job_id} started`);
            const events = new EventSource(accepted.events_url);
            const refresh = async () => {
                const job = await send(accepted.status_url);
                if (!job) return;
                show(job);
                if (job.state !== 'RUNNING') events.close();
            };
            ['JobProgress', 'JobCompleted', 'JobFailed', 'JobCancelled'].forEach((name) =>
                events.addEventListener(name, (e) => {
                    if (JSON.parse(e.data).job_id === accepted.job_id) refresh();
                })
            );
        }

        async function generateText() {
            const prompt = document.getElementById('text-prompt').value;
            const body = await send('/api/text', {
                method: 'POST',
                headers: { 'Content-Type': 'application/json' },
                body: JSON.stringify({ prompt }),
            });
            if (body) show(body.result);
        }

        async function generateImages() {
            const prompt = document.getElementById('image-prompt').value;
            const num_images = parseInt(document.getElementById('image-count').value, 10);
            watch(await send('/api/images/generate', {
                method: 'POST',
                headers: { 'Content-Type': 'application/json' },
                body: JSON.stringify({ prompt, num_images }),
            }));
        }

        const submitForm = (id, url) => {
            document.getElementById(id).addEventListener('submit', async (e) => {
                e.preventDefault();
                const target = typeof url === 'function' ? url() : url;
                watch(await send(target, { method: 'POST', body: new FormData(e.target) }));
            });
        };
        submitForm('media-form', () => `/api/media/${document.getElementById('media-kind').value}`);
        submitForm('rows-form', '/api/excel/rows');
        submitForm('story-form', '/api/story/prompts');

        fetch('/api/prompts').then((r) => r.json()).then((library) => {
            const select = document.getElementById('library');
            select.add(new Option('Prompt library...', ''));
            library.forEach((category) =>
                category.prompts.forEach((p) =>
                    select.add(new Option(`${category.category}: ${p.title}`, p.prompt_text))
                )
            );
            select.onchange = () => {
                if (select.value) document.getElementById('text-prompt').value = select.value;
            };
        });
    </script>
</body>
</html>
"#;
